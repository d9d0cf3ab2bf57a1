//! The gallery viewer state the UI shell renders from.
//!
//! A [`Gallery`] owns the display-ordered list, the orientation cache for
//! that list and the navigation position. Every index it hands out is in
//! range for the current list; an empty list has no slide at all.

use shared::domain::{MediaId, ProjectId};
use tracing::debug;

use crate::{
    navigation::{DeviceClass, NavigationController, NavigationKey, PointerSide},
    ordering::{order_for_display, GalleryItem},
    orientation::{classify, DimensionProbe, Orientation, OrientationCache},
    pairing::PairingPlanner,
};

/// Which collection a gallery is showing. A change of identity restarts
/// the viewer; the same identity with new contents is a refresh.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum ListIdentity {
    Project(ProjectId),
    FeaturedReel,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ListChange {
    Reset,
    Refreshed,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Slide<'a, T> {
    Single { index: usize, item: &'a T },
    Pair { index: usize, first: &'a T, second: &'a T },
}

impl<'a, T> Slide<'a, T> {
    pub fn index(&self) -> usize {
        match self {
            Slide::Single { index, .. } | Slide::Pair { index, .. } => *index,
        }
    }

    pub fn is_pair(&self) -> bool {
        matches!(self, Slide::Pair { .. })
    }
}

/// One outstanding orientation probe, tied to the list it was issued for.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProbeRequest {
    pub identity: ListIdentity,
    pub index: usize,
    pub media_id: MediaId,
    pub url: String,
}

fn planner_for<'a, T: GalleryItem>(
    items: &'a [T],
    cache: &'a OrientationCache,
    device: DeviceClass,
) -> PairingPlanner<impl Fn(usize) -> bool + 'a> {
    PairingPlanner::new(items.len(), device, move |i| {
        items.get(i).is_some_and(|item| {
            cache
                .get(i, item.media().id)
                .is_some_and(Orientation::is_portrait)
        })
    })
}

#[derive(Debug, Clone)]
pub struct Gallery<T> {
    identity: Option<ListIdentity>,
    items: Vec<T>,
    orientations: OrientationCache,
    nav: NavigationController,
}

impl<T: GalleryItem> Default for Gallery<T> {
    fn default() -> Self {
        Self::new(DeviceClass::Desktop)
    }
}

impl<T: GalleryItem> Gallery<T> {
    pub fn new(device: DeviceClass) -> Self {
        Self {
            identity: None,
            items: Vec::new(),
            orientations: OrientationCache::default(),
            nav: NavigationController::new(device),
        }
    }

    /// Replaces the list. A new identity starts over at the first slide and
    /// drops all classifications; the same identity keeps the position,
    /// wrapped into the new length.
    pub fn set_list(&mut self, identity: ListIdentity, items: &[T]) -> ListChange {
        self.items = order_for_display(items);
        if self.identity.as_ref() == Some(&identity) {
            self.nav.clamp_to(self.items.len());
            debug!(?identity, len = self.items.len(), "gallery list refreshed");
            ListChange::Refreshed
        } else {
            self.orientations.clear();
            self.nav.reset();
            debug!(?identity, len = self.items.len(), "gallery list replaced");
            self.identity = Some(identity);
            ListChange::Reset
        }
    }

    pub fn identity(&self) -> Option<&ListIdentity> {
        self.identity.as_ref()
    }

    pub fn display_list(&self) -> &[T] {
        &self.items
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn device(&self) -> DeviceClass {
        self.nav.device()
    }

    pub fn set_viewport_width(&mut self, width: u32) {
        self.nav.set_device(DeviceClass::from_viewport_width(width));
    }

    pub fn pointer_side(&self) -> PointerSide {
        self.nav.pointer_side()
    }

    pub fn current_index(&self) -> Option<usize> {
        (!self.items.is_empty()).then(|| self.nav.current_index())
    }

    pub fn is_paired(&self) -> bool {
        self.current_slide().is_some_and(|slide| slide.is_pair())
    }

    pub fn current_slide(&self) -> Option<Slide<'_, T>> {
        let index = self.current_index()?;
        let planner = planner_for(&self.items, &self.orientations, self.nav.device());
        if planner.can_pair(index) {
            Some(Slide::Pair {
                index,
                first: &self.items[index],
                second: &self.items[index + 1],
            })
        } else {
            Some(Slide::Single {
                index,
                item: &self.items[index],
            })
        }
    }

    /// One-based position and total, for a "3 / 12" counter.
    pub fn counter(&self) -> Option<(usize, usize)> {
        self.current_index()
            .map(|index| (index + 1, self.items.len()))
    }

    pub fn orientation(&self, index: usize) -> Option<Orientation> {
        let item = self.items.get(index)?;
        self.orientations.get(index, item.media().id)
    }

    pub fn pointer_moved(&mut self, x: f64, width: f64) {
        self.nav.pointer_moved(x, width);
    }

    pub fn set_over_video_controls(&mut self, over: bool) {
        self.nav.set_over_video_controls(over);
    }

    pub fn click(&mut self) -> bool {
        let Self {
            items,
            orientations,
            nav,
            ..
        } = self;
        let planner = planner_for(items, orientations, nav.device());
        nav.click(&planner)
    }

    pub fn advance(&mut self) {
        let Self {
            items,
            orientations,
            nav,
            ..
        } = self;
        let planner = planner_for(items, orientations, nav.device());
        nav.advance(&planner);
    }

    pub fn retreat(&mut self) {
        let Self {
            items,
            orientations,
            nav,
            ..
        } = self;
        let planner = planner_for(items, orientations, nav.device());
        nav.retreat(&planner);
    }

    pub fn key(&mut self, key: NavigationKey) {
        let Self {
            items,
            orientations,
            nav,
            ..
        } = self;
        let planner = planner_for(items, orientations, nav.device());
        nav.key(key, &planner);
    }

    pub fn goto(&mut self, index: usize) {
        self.nav.goto(index, self.items.len());
    }

    /// Images still waiting for classification. Empty off desktop, where
    /// orientation plays no part.
    pub fn pending_probes(&self) -> Vec<ProbeRequest> {
        let Some(identity) = &self.identity else {
            return Vec::new();
        };
        if !self.nav.device().supports_pairing() {
            return Vec::new();
        }
        self.items
            .iter()
            .enumerate()
            .map(|(index, item)| (index, item.media()))
            .filter(|(index, media)| {
                !media.is_video() && !self.orientations.contains(*index, media.id)
            })
            .map(|(index, media)| ProbeRequest {
                identity: identity.clone(),
                index,
                media_id: media.id,
                url: media.url.clone(),
            })
            .collect()
    }

    /// Records a probe result. Results for a list that has since been
    /// replaced, or for a slot now holding another item, are dropped.
    pub fn apply_orientation(&mut self, request: &ProbeRequest, orientation: Orientation) -> bool {
        if self.identity.as_ref() != Some(&request.identity) {
            return false;
        }
        let slot_matches = self
            .items
            .get(request.index)
            .is_some_and(|item| item.media().id == request.media_id);
        if !slot_matches {
            return false;
        }
        self.orientations
            .record(request.index, request.media_id, orientation)
    }

    /// Probes every pending image in display order. Returns how many
    /// classifications were recorded.
    pub async fn classify_pending(&mut self, probe: &dyn DimensionProbe) -> usize {
        let mut recorded = 0;
        for request in self.pending_probes() {
            let Some(item) = self.items.get(request.index).map(|item| item.media().clone()) else {
                continue;
            };
            if let Some(orientation) = classify(probe, &item).await {
                if self.apply_orientation(&request, orientation) {
                    recorded += 1;
                }
            }
        }
        recorded
    }
}

#[cfg(test)]
#[path = "tests/gallery_tests.rs"]
mod tests;
