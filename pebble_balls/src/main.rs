use std::cell::Cell;
use std::env;
use std::fs;
use std::ops::ControlFlow;
use std::rc::Rc;

use anyhow::{Context, Result};
use log::{debug, info};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};

use pebble_ecs::{Component, Entity, World, WorldConfig};

use draw::{DrawList, Quad};

mod draw;

#[derive(Debug, Clone, Copy, PartialEq, Component)]
struct Position {
    x: f32,
    y: f32,
}

#[derive(Debug, Clone, Copy, PartialEq, Component)]
struct Velocity {
    x: f32,
    y: f32,
}

#[derive(Debug, Clone, Copy, PartialEq, Component)]
struct Player {
    speed: f32,
    left: bool,
    right: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Component)]
struct Circle {
    size: f32,
}

#[derive(Debug, Clone, Copy, PartialEq, Component)]
struct Square {
    size: f32,
}

#[derive(Debug, Clone, Copy, PartialEq, Component)]
pub struct Color {
    r: u8,
    g: u8,
    b: u8,
    a: u8,
}

impl Color {
    pub fn to_rgba(self) -> [f32; 4] {
        [self.r, self.g, self.b, self.a].map(|c| f32::from(c) / 255.0)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
struct Settings {
    /// Number of simulated frames.
    ticks: u32,
    /// Seconds per frame.
    timestep: f32,
    /// Seconds between two balls at the start. Shrinks over time.
    difficulty: f32,
    seed: u64,
    world: WorldConfig,
}

impl Default for Settings {
    fn default() -> Self {
        Settings {
            ticks: 60 * 60,
            timestep: 1.0 / 60.0,
            difficulty: 3.0,
            seed: 0x5eed,
            world: WorldConfig::default(),
        }
    }
}

fn load_settings() -> Result<Settings> {
    match env::args().nth(1) {
        Some(path) => {
            let text = fs::read_to_string(&path).with_context(|| format!("reading {}", path))?;
            serde_json::from_str(&text).with_context(|| format!("parsing {}", path))
        }
        None => Ok(Settings::default()),
    }
}

fn spawn_ball(world: &mut World, rng: &mut StdRng) -> Entity {
    world
        .spawn()
        .with(Position {
            x: rng.gen_range(-400.0..400.0),
            y: -500.0,
        })
        .with(Velocity { x: 0.0, y: 700.0 })
        .with(Circle { size: 32.0 })
        .with(Color {
            r: rng.gen(),
            g: rng.gen(),
            b: rng.gen(),
            a: 255,
        })
        .entity()
}

fn overlaps(square_pos: Position, square: Square, ball_pos: Position, ball: Circle) -> bool {
    let s = square.size / 2.0;
    let b = ball.size / 2.0;

    square_pos.x + s > ball_pos.x - b
        && square_pos.y + s > ball_pos.y - b
        && square_pos.x - s < ball_pos.x + b
        && square_pos.y - s < ball_pos.y + b
}

fn main() -> Result<()> {
    use env_logger::{Builder, Env};

    Builder::from_env(Env::default().default_filter_or("info")).init();

    let settings = load_settings()?;
    let mut rng = StdRng::seed_from_u64(settings.seed);
    let mut world = World::with_config(settings.world);
    let mut draw = DrawList::new();

    let removed = Rc::new(Cell::new(0u32));
    {
        let removed = removed.clone();
        world.set_destroy_hook::<Circle>(move |_, _| removed.set(removed.get() + 1));
    }

    world
        .spawn()
        .with(Player {
            speed: 800.0,
            left: false,
            right: false,
        })
        .with(Position { x: 0.0, y: 300.0 })
        .with(Square { size: 100.0 })
        .with(Color {
            r: 255,
            g: 255,
            b: 255,
            a: 255,
        });

    spawn_ball(&mut world, &mut rng);

    let ts = settings.timestep;
    let mut difficulty = settings.difficulty;
    let mut spawn_timer = 0.0f32;
    let mut timer = 0.0f32;
    let mut caught = 0u32;

    for tick in 0..settings.ticks {
        if spawn_timer > difficulty {
            spawn_timer = 0.0;
            spawn_ball(&mut world, &mut rng);
        }

        world.scan::<(Position, Velocity)>(|w, e| {
            let velocity = *w.get::<Velocity>(e);
            let position = w.get_mut::<Position>(e);
            position.x += velocity.x * ts;
            position.y += velocity.y * ts;
            ControlFlow::Continue(())
        });

        let mut players = world.view::<(Player, Position, Square)>();
        while let Some(p) = players.next(&mut world) {
            // Chase the lowest ball that is still above the player
            let mut target: Option<(f32, f32)> = None;
            world.scan::<(Position, Circle)>(|w, ball| {
                let y = w.get::<Position>(ball).y;
                if y < 300.0 && target.map_or(true, |(_, ty)| y > ty) {
                    target = Some((w.get::<Position>(ball).x, y));
                }
                ControlFlow::Continue(())
            });

            let x = world.get::<Position>(p).x;
            let player = world.get_mut::<Player>(p);
            player.left = matches!(target, Some((tx, _)) if tx < x - 4.0);
            player.right = matches!(target, Some((tx, _)) if tx > x + 4.0);

            let player = *player;
            let square = *world.get::<Square>(p);
            let position = {
                let position = world.get_mut::<Position>(p);
                if player.left {
                    position.x -= player.speed * ts;
                }
                if player.right {
                    position.x += player.speed * ts;
                }
                *position
            };

            // Destroying balls from inside the scan that found them
            world.scan::<(Position, Circle)>(|w, ball| {
                let ball_pos = *w.get::<Position>(ball);
                let circle = *w.get::<Circle>(ball);

                if overlaps(position, square, ball_pos, circle) {
                    caught += 1;
                    w.destroy(ball);
                } else if ball_pos.y > 500.0 {
                    w.destroy(ball);
                }
                ControlFlow::Continue(())
            });
        }

        world.scan::<(Position, Square, Color)>(|w, e| {
            let position = *w.get::<Position>(e);
            let size = w.get::<Square>(e).size;
            draw.push(Quad {
                x: position.x,
                y: position.y,
                w: size,
                h: size,
                color: *w.get::<Color>(e),
                circle: false,
            });
            ControlFlow::Continue(())
        });

        world.scan::<(Position, Circle, Color)>(|w, e| {
            let position = *w.get::<Position>(e);
            let size = w.get::<Circle>(e).size;
            draw.push(Quad {
                x: position.x,
                y: position.y,
                w: size,
                h: size,
                color: *w.get::<Color>(e),
                circle: true,
            });
            ControlFlow::Continue(())
        });

        draw.flush();

        timer += ts;
        spawn_timer += ts;
        difficulty = (difficulty - ts * 0.05).max(0.1);

        if timer > 1.0 {
            timer = 0.0;
            info!(
                "tick {}: {} entities, {} balls caught, {} removed",
                tick,
                world.count(),
                caught,
                removed.get()
            );

            // Once per simulated second
            let shrunk = world.compact()?;
            debug!("compacted {} pool(s)", shrunk);
        }
    }

    info!(
        "done: {} quads in {} batches ({} circles, {} offscreen), {} balls caught, {} removed, {} entities left",
        draw.drawn,
        draw.batches,
        draw.circles,
        draw.offscreen,
        caught,
        removed.get(),
        world.count()
    );

    Ok(())
}
