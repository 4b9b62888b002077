//! crates/soul_map_core/src/board.rs
//!
//! The keyed collection of recommended spots shown on the result view, and
//! the selector that decides which image a spot presents.

use std::collections::HashMap;

use crate::domain::{ImageRef, ImageVariant, SpotId, TravelSpot};

/// A spot plus its image loading flag.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SpotEntry {
    pub spot: TravelSpot,
    pub image_loading: bool,
}

/// Spots keyed by id. Updates are addressed by key, never by position;
/// `order` only remembers the order the service returned them in.
#[derive(Debug, Clone, Default)]
pub struct SpotBoard {
    order: Vec<SpotId>,
    entries: HashMap<SpotId, SpotEntry>,
}

impl SpotBoard {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replaces the board content; every spot starts with its images loading.
    pub fn load(&mut self, spots: Vec<TravelSpot>) {
        self.clear();
        for spot in spots {
            self.order.push(spot.id.clone());
            self.entries.insert(
                spot.id.clone(),
                SpotEntry {
                    spot,
                    image_loading: true,
                },
            );
        }
    }

    /// Merges the resolved images into a spot and clears its loading flag.
    ///
    /// `None` leaves the existing reference untouched. Returns the updated spot,
    /// or `None` if the id is not on the board.
    pub fn settle(
        &mut self,
        id: &SpotId,
        day: Option<ImageRef>,
        night: Option<ImageRef>,
    ) -> Option<TravelSpot> {
        let entry = self.entries.get_mut(id)?;
        if day.is_some() {
            entry.spot.day_image = day;
        }
        if night.is_some() {
            entry.spot.night_image = night;
        }
        entry.image_loading = false;
        Some(entry.spot.clone())
    }

    pub fn get(&self, id: &SpotId) -> Option<&SpotEntry> {
        self.entries.get(id)
    }

    pub fn is_loading(&self, id: &SpotId) -> bool {
        self.entries.get(id).is_some_and(|e| e.image_loading)
    }

    /// Entries in service order.
    pub fn entries(&self) -> impl Iterator<Item = &SpotEntry> {
        self.order.iter().filter_map(|id| self.entries.get(id))
    }

    pub fn spots(&self) -> Vec<TravelSpot> {
        self.entries().map(|e| e.spot.clone()).collect()
    }

    pub fn all_settled(&self) -> bool {
        self.entries.values().all(|e| !e.image_loading)
    }

    pub fn len(&self) -> usize {
        self.order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    pub fn clear(&mut self) {
        self.order.clear();
        self.entries.clear();
    }
}

/// Picks the image a spot should show for the selected variant.
///
/// Night falls back to day when the night image is missing. Without a day
/// image nothing is shown, whatever the variant, and the caller renders its
/// placeholder state.
pub fn select_image(spot: &TravelSpot, variant: ImageVariant) -> Option<&ImageRef> {
    let day = spot.day_image.as_ref()?;
    match variant {
        ImageVariant::Night => Some(spot.night_image.as_ref().unwrap_or(day)),
        ImageVariant::Day => Some(day),
    }
}
