use image::Rgba;
use rand::Rng;

use super::face::Face;
use super::{CloudStyle, WeightedLabels};
use crate::error::RenderError;

#[derive(Debug, Clone, PartialEq)]
pub struct Placement {
    pub label: String,
    pub font_size: f32,
    pub x: u32,
    pub y: u32,
    pub width: u32,
    pub height: u32,
    pub color: Rgba<u8>,
}

// Largest word first. Sizes follow the weight ratio to the previous word,
// damped by relative_scaling, then shrink a step at a time until a free spot
// exists. Once a word fails at the minimum size it and every smaller word are dropped.
pub fn layout<F, R>(labels: &WeightedLabels, face: &F, style: &CloudStyle, rng: &mut R) -> Result<Vec<Placement>, RenderError>
where
    F: Face + ?Sized,
    R: Rng,
{
    let words = normalized(labels);
    if words.is_empty() {
        return Ok(Vec::new());
    }

    let max_font_size = match style.max_font_size {
        Some(size) => size,
        None => {
            // Trial run with the two heaviest words at full canvas height.
            let trial = place_words(&words[..words.len().min(2)], face, style, style.height as f32, rng);
            match trial.as_slice() {
                [] => return Err(no_space(style)),
                [only] => only.font_size,
                [a, b, ..] => (2.0 * a.font_size * b.font_size / (a.font_size + b.font_size)).floor(),
            }
        }
    };

    let placements = place_words(&words, face, style, max_font_size, rng);
    if placements.is_empty() {
        return Err(no_space(style));
    }
    Ok(placements)
}

fn no_space(style: &CloudStyle) -> RenderError {
    RenderError::NoSpace {
        width: style.width,
        height: style.height,
    }
}

// Heaviest first (stable for ties), weights scaled into (0, 1].
fn normalized(labels: &WeightedLabels) -> Vec<(&str, f64)> {
    let mut words: Vec<(&str, u64)> = labels.iter().filter(|(_, count)| *count > 0).collect();
    words.sort_by(|a, b| b.1.cmp(&a.1));

    let Some(&(_, max)) = words.first() else {
        return Vec::new();
    };
    words
        .into_iter()
        .map(|(label, count)| (label, count as f64 / max as f64))
        .collect()
}

fn place_words<F, R>(words: &[(&str, f64)], face: &F, style: &CloudStyle, start_size: f32, rng: &mut R) -> Vec<Placement>
where
    F: Face + ?Sized,
    R: Rng,
{
    let mut occupancy = Occupancy::new(style.width, style.height);
    let mut placements = Vec::with_capacity(words.len());
    let mut font_size = start_size;
    let mut last_freq = 1.0;
    let rs = style.relative_scaling;

    for &(label, freq) in words {
        if rs != 0.0 {
            font_size = ((rs * (freq / last_freq) + (1.0 - rs)) * font_size as f64).round() as f32;
        }

        let found = loop {
            if font_size < style.min_font_size {
                break None;
            }
            let (width, height) = face.measure(label, font_size);
            let box_w = width + style.margin;
            let box_h = height + style.margin;
            if let Some((x, y)) = occupancy.sample(box_w, box_h, rng) {
                occupancy.fill(x, y, box_w, box_h);
                break Some((x, y, width, height));
            }
            font_size -= style.font_step;
        };

        // Nothing smaller will fit either
        let Some((x, y, width, height)) = found else {
            break;
        };

        let color = style.palette[rng.random_range(0..style.palette.len())];
        placements.push(Placement {
            label: label.to_string(),
            font_size,
            x: x + style.margin / 2,
            y: y + style.margin / 2,
            width,
            height,
            color,
        });
        last_freq = freq;
    }

    placements
}

// Occupied-pixel mask plus a summed-area table for box queries.
struct Occupancy {
    width: u32,
    height: u32,
    mask: Vec<bool>,
    integral: Vec<u32>,
}

impl Occupancy {
    fn new(width: u32, height: u32) -> Self {
        let mask = vec![false; (width * height) as usize];
        let integral = vec![0; ((width + 1) * (height + 1)) as usize];
        Self {
            width,
            height,
            mask,
            integral,
        }
    }

    fn area(&self, x: u32, y: u32, w: u32, h: u32) -> u32 {
        let stride = (self.width + 1) as usize;
        let at = |x: u32, y: u32| self.integral[y as usize * stride + x as usize];
        at(x + w, y + h) + at(x, y) - at(x + w, y) - at(x, y + h)
    }

    fn free_positions(&self, w: u32, h: u32) -> impl Iterator<Item = (u32, u32)> + '_ {
        let max_x = self.width - w;
        let max_y = self.height - h;
        (0..=max_y)
            .flat_map(move |y| (0..=max_x).map(move |x| (x, y)))
            .filter(move |&(x, y)| self.area(x, y, w, h) == 0)
    }

    // Uniform over every top-left corner where a w x h box is free.
    fn sample<R: Rng>(&self, w: u32, h: u32, rng: &mut R) -> Option<(u32, u32)> {
        if w == 0 || h == 0 || w > self.width || h > self.height {
            return None;
        }
        let count = self.free_positions(w, h).count();
        if count == 0 {
            return None;
        }
        let pick = rng.random_range(0..count);
        self.free_positions(w, h).nth(pick)
    }

    fn fill(&mut self, x: u32, y: u32, w: u32, h: u32) {
        for row in y..(y + h).min(self.height) {
            let start = (row * self.width + x) as usize;
            let end = (row * self.width + (x + w).min(self.width)) as usize;
            self.mask[start..end].fill(true);
        }
        self.rebuild();
    }

    fn rebuild(&mut self) {
        let stride = (self.width + 1) as usize;
        for y in 0..self.height as usize {
            let mut row_sum = 0;
            for x in 0..self.width as usize {
                row_sum += self.mask[y * self.width as usize + x] as u32;
                self.integral[(y + 1) * stride + x + 1] = self.integral[y * stride + x + 1] + row_sum;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::wordcloud::tests::BlockFace;
    use rand::SeedableRng;
    use rand::rngs::StdRng;

    fn small_style() -> CloudStyle {
        CloudStyle {
            width: 200,
            height: 120,
            ..CloudStyle::default()
        }
    }

    fn labels(pairs: &[(&str, u64)]) -> WeightedLabels {
        let mut labels = WeightedLabels::default();
        for &(label, count) in pairs {
            labels.add(label, count);
        }
        labels
    }

    fn overlaps(a: &Placement, b: &Placement) -> bool {
        a.x < b.x + b.width && b.x < a.x + a.width && a.y < b.y + b.height && b.y < a.y + a.height
    }

    #[test]
    fn occupancy_finds_only_free_positions() {
        let mut occupancy = Occupancy::new(10, 10);
        occupancy.fill(0, 0, 10, 5);
        assert_eq!(occupancy.area(0, 0, 10, 10), 50);
        assert!(occupancy.free_positions(10, 5).all(|(_, y)| y == 5));

        let mut rng = StdRng::seed_from_u64(1);
        assert_eq!(occupancy.sample(10, 5, &mut rng), Some((0, 5)));
        assert_eq!(occupancy.sample(10, 6, &mut rng), None);
    }

    #[test]
    fn heavier_words_get_larger_fonts() {
        let mut rng = StdRng::seed_from_u64(7);
        let words = labels(&[("small", 1), ("big", 8), ("mid", 4)]);
        let placed = layout(&words, &BlockFace, &small_style(), &mut rng).unwrap();

        assert_eq!(placed.first().map(|p| p.label.as_str()), Some("big"));
        let size = |label: &str| placed.iter().find(|p| p.label == label).map(|p| p.font_size);
        if let (Some(big), Some(mid)) = (size("big"), size("mid")) {
            assert!(big >= mid);
        }
    }

    #[test]
    fn placements_stay_on_canvas_and_apart() {
        let style = small_style();
        let mut rng = StdRng::seed_from_u64(42);
        let words = labels(&[("alpha", 5), ("beta", 3), ("gamma", 3), ("delta", 1)]);
        let placed = layout(&words, &BlockFace, &style, &mut rng).unwrap();

        assert!(!placed.is_empty());
        for (i, a) in placed.iter().enumerate() {
            assert!(a.x + a.width <= style.width && a.y + a.height <= style.height);
            assert!(style.palette.contains(&a.color));
            for b in &placed[i + 1..] {
                assert!(!overlaps(a, b), "{} overlaps {}", a.label, b.label);
            }
        }
    }

    #[test]
    fn same_seed_same_layout() {
        let words = labels(&[("one", 2), ("two", 1)]);
        let first = layout(&words, &BlockFace, &small_style(), &mut StdRng::seed_from_u64(3)).unwrap();
        let second = layout(&words, &BlockFace, &small_style(), &mut StdRng::seed_from_u64(3)).unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn word_wider_than_canvas_at_min_size_is_no_space() {
        let style = CloudStyle {
            width: 20,
            height: 20,
            ..CloudStyle::default()
        };
        let words = labels(&[("an extremely long label", 1)]);
        let err = layout(&words, &BlockFace, &style, &mut StdRng::seed_from_u64(0)).unwrap_err();
        assert!(matches!(err, RenderError::NoSpace { .. }));
    }
}
