/// ASCII rasterizer for voxel faces and grid lines
use crossterm::{
    style::{Color, Print, ResetColor, SetForegroundColor},
    QueueableCommand,
};
use isogrid_core::{Face, LineSeg, Point, Voxel};
use std::io::Write;

/// Character luminosity ramp for shading (darkest to lightest)
const LUMINOSITY_RAMP: &[char] = &[' ', '.', ':', '-', '=', '+', '*', '#', '%', '@'];

/// Character used for grid lines on the ground plane
const GRID_CHAR: char = '.';

/// Overdrawing renderer: later faces cover earlier ones.
pub struct AsciiRenderer {
    width: usize,
    height: usize,
    char_buffer: Vec<char>,
}

impl AsciiRenderer {
    pub fn new(width: usize, height: usize) -> Self {
        Self {
            width,
            height,
            char_buffer: vec![' '; width * height],
        }
    }

    pub fn resize(&mut self, width: usize, height: usize) {
        *self = Self::new(width, height);
    }

    pub fn clear(&mut self) {
        self.char_buffer.fill(' ');
    }

    pub fn char_at(&self, x: usize, y: usize) -> Option<char> {
        (x < self.width && y < self.height).then(|| self.char_buffer[y * self.width + x])
    }

    /// Draw voxels in the order given, which should be far to near.
    pub fn render_voxels(&mut self, voxels: &[Voxel]) {
        for voxel in voxels {
            for face in voxel.faces() {
                self.render_face(face);
            }
        }
    }

    pub fn render_face(&mut self, face: &Face) {
        let brightness = face.shade.brightness();
        let char_index = (brightness * (LUMINOSITY_RAMP.len() - 1) as f32) as usize;
        let character = LUMINOSITY_RAMP[char_index.min(LUMINOSITY_RAMP.len() - 1)];

        for triangle in face.triangles() {
            self.rasterize_triangle(&triangle, character);
        }
    }

    pub fn render_lines(&mut self, lines: &[LineSeg]) {
        for line in lines {
            self.rasterize_line(line, GRID_CHAR);
        }
    }

    fn rasterize_line(&mut self, line: &LineSeg, character: char) {
        // Step only across the visible part, so cost is bounded by the screen.
        let Some(visible) = clip_line(line, self.width as f64, self.height as f64) else {
            return;
        };
        let delta = visible.vector();
        let steps = delta.x.abs().max(delta.y.abs()).ceil().max(1.0) as usize;
        for i in 0..=steps {
            let t = i as f64 / steps as f64;
            let p = visible.start + delta * t;
            self.plot(p.x.floor(), p.y.floor(), character);
        }
    }

    fn plot(&mut self, x: f64, y: f64, character: char) {
        if x >= 0.0 && y >= 0.0 && (x as usize) < self.width && (y as usize) < self.height {
            self.char_buffer[y as usize * self.width + x as usize] = character;
        }
    }

    fn rasterize_triangle(&mut self, coords: &[Point; 3], character: char) {
        let (v0, v1, v2) = (coords[0], coords[1], coords[2]);

        // Bounding box
        let min_x = v0.x.min(v1.x).min(v2.x).floor() as i64;
        let max_x = v0.x.max(v1.x).max(v2.x).ceil() as i64;
        let min_y = v0.y.min(v1.y).min(v2.y).floor() as i64;
        let max_y = v0.y.max(v1.y).max(v2.y).ceil() as i64;

        // Clip to screen bounds
        let min_x = min_x.max(0);
        let max_x = max_x.min(self.width as i64 - 1);
        let min_y = min_y.max(0);
        let max_y = max_y.min(self.height as i64 - 1);

        // Scanline rasterization, sampling cell centres
        for y in min_y..=max_y {
            for x in min_x..=max_x {
                let p = Point::new(x as f64 + 0.5, y as f64 + 0.5);
                if let Some((w0, w1, w2)) = barycentric(&v0, &v1, &v2, &p) {
                    if w0 >= 0.0 && w1 >= 0.0 && w2 >= 0.0 {
                        self.char_buffer[y as usize * self.width + x as usize] = character;
                    }
                }
            }
        }
    }

    pub fn draw<W: Write>(&self, writer: &mut W) -> std::io::Result<()> {
        for y in 0..self.height {
            for x in 0..self.width {
                let c = self.char_buffer[y * self.width + x];

                // Color based on character intensity
                let color = match c {
                    ' ' | '.' | ':' => Color::DarkGrey,
                    '-' | '=' => Color::Grey,
                    '+' | '*' => Color::White,
                    '#' | '%' | '@' => Color::Cyan,
                    _ => Color::White,
                };

                writer.queue(SetForegroundColor(color))?;
                writer.queue(Print(c))?;
            }
            if y + 1 < self.height {
                writer.queue(Print("\r\n"))?;
            }
        }
        writer.queue(ResetColor)?;
        Ok(())
    }
}

/// Liang–Barsky clip of `line` to `[0, width] × [0, height]`.
///
/// Returns `None` when nothing is visible or an endpoint is not finite.
fn clip_line(line: &LineSeg, width: f64, height: f64) -> Option<LineSeg> {
    let (p, q) = (line.start, line.end);
    if ![p.x, p.y, q.x, q.y].iter().all(|v| v.is_finite()) {
        return None;
    }

    let d = line.vector();
    let (mut t0, mut t1) = (0.0_f64, 1.0_f64);
    let edges = [
        (-d.x, p.x),
        (d.x, width - p.x),
        (-d.y, p.y),
        (d.y, height - p.y),
    ];
    for (denom, dist) in edges {
        if denom == 0.0 {
            if dist < 0.0 {
                return None;
            }
            continue;
        }
        let t = dist / denom;
        if denom < 0.0 {
            t0 = t0.max(t);
        } else {
            t1 = t1.min(t);
        }
        if t0 > t1 {
            return None;
        }
    }

    Some(LineSeg::new(p + d * t0, p + d * t1))
}

/// Barycentric coordinates of `p`, or `None` for a degenerate triangle
fn barycentric(v0: &Point, v1: &Point, v2: &Point, p: &Point) -> Option<(f64, f64, f64)> {
    let denom = (v1.y - v2.y) * (v0.x - v2.x) + (v2.x - v1.x) * (v0.y - v2.y);

    if denom.abs() < 1e-9 {
        return None;
    }

    let w0 = ((v1.y - v2.y) * (p.x - v2.x) + (v2.x - v1.x) * (p.y - v2.y)) / denom;
    let w1 = ((v2.y - v0.y) * (p.x - v2.x) + (v0.x - v2.x) * (p.y - v2.y)) / denom;
    let w2 = 1.0 - w0 - w1;

    Some((w0, w1, w2))
}
