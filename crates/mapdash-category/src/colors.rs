use mapdash_core::Color;
use std::collections::{HashMap, HashSet};

pub const DEFAULT_PALETTE: [&str; 10] = [
    "#7F3C8D", "#11A579", "#3969AC", "#F2B701", "#E73F74", "#80BA5A", "#E68310", "#008695",
    "#CF1C90", "#f97b72",
];

/// Color for the aggregated bucket and for names beyond the palette.
pub const OTHER_COLOR: &str = "#A5AA99";

pub const OTHER_CATEGORY: &str = "Other";

/// Keeps every category on the palette slot it was first given, even across
/// updates it is missing from.
#[derive(Debug, Clone)]
pub struct ColorAssigner {
    palette: Vec<Color>,
    fallback: Color,
    slots: HashMap<String, usize>,
}

impl Default for ColorAssigner {
    fn default() -> Self {
        Self::new()
    }
}

impl ColorAssigner {
    pub fn new() -> Self {
        Self::with_palette(
            DEFAULT_PALETTE.iter().map(|hex| Color::new(*hex)),
            Color::new(OTHER_COLOR),
        )
    }

    pub fn with_palette(palette: impl IntoIterator<Item = Color>, fallback: Color) -> Self {
        Self {
            palette: palette.into_iter().collect(),
            fallback,
            slots: HashMap::new(),
        }
    }

    /// Hand the lowest unheld slots to unseen names in order of appearance.
    /// Slots are never released, so a name that drops out and comes back
    /// keeps its color.
    pub fn update_data<I, S>(&mut self, names: I)
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut taken: HashSet<usize> = self.slots.values().copied().collect();
        for name in names {
            let name = name.as_ref();
            if name == OTHER_CATEGORY || self.slots.contains_key(name) {
                continue;
            }
            let Some(slot) = (0..self.palette.len()).find(|slot| !taken.contains(slot)) else {
                continue;
            };
            taken.insert(slot);
            self.slots.insert(name.to_string(), slot);
        }
    }

    pub fn color_by_category(&self, name: &str) -> Color {
        self.slots
            .get(name)
            .and_then(|slot| self.palette.get(*slot))
            .cloned()
            .unwrap_or_else(|| self.fallback.clone())
    }

    pub fn assigned_count(&self) -> usize {
        self.slots.len()
    }
}
