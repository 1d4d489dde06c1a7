use crate::Color;

const MAX_QUADS: usize = 800;

const HALF_WIDTH: f32 = 1366.0 / 2.0;
const HALF_HEIGHT: f32 = 768.0 / 2.0;

#[derive(Clone, Copy, Debug)]
pub struct Quad {
    pub x: f32,
    pub y: f32,
    pub w: f32,
    pub h: f32,
    pub color: Color,
    pub circle: bool,
}

/// Batches quads the way a GPU batch renderer would, without any GPU. Keeps counts so the run can be summarised.
pub struct DrawList {
    quads: Vec<Quad>,
    pub batches: usize,
    pub drawn: usize,
    pub circles: usize,
    pub offscreen: usize,
}

impl DrawList {
    pub fn new() -> Self {
        DrawList {
            quads: Vec::with_capacity(MAX_QUADS),
            batches: 0,
            drawn: 0,
            circles: 0,
            offscreen: 0,
        }
    }

    pub fn push(&mut self, quad: Quad) {
        if self.quads.len() >= MAX_QUADS {
            self.flush();
        }
        self.quads.push(quad);
    }

    pub fn flush(&mut self) {
        if self.quads.is_empty() {
            return;
        }

        self.batches += 1;

        for q in &self.quads {
            if q.color.to_rgba()[3] == 0.0 {
                continue;
            }

            let visible = q.x + q.w / 2.0 > -HALF_WIDTH
                && q.x - q.w / 2.0 < HALF_WIDTH
                && q.y + q.h / 2.0 > -HALF_HEIGHT
                && q.y - q.h / 2.0 < HALF_HEIGHT;

            if !visible {
                self.offscreen += 1;
            }
            if q.circle {
                self.circles += 1;
            }
            self.drawn += 1;
        }

        self.quads.clear();
    }
}
