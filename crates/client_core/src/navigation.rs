use crate::pairing::PairingPlanner;

pub const TABLET_MIN_WIDTH: u32 = 768;
pub const DESKTOP_MIN_WIDTH: u32 = 1024;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DeviceClass {
    Mobile,
    Tablet,
    Desktop,
}

impl DeviceClass {
    pub fn from_viewport_width(width: u32) -> Self {
        if width < TABLET_MIN_WIDTH {
            DeviceClass::Mobile
        } else if width < DESKTOP_MIN_WIDTH {
            DeviceClass::Tablet
        } else {
            DeviceClass::Desktop
        }
    }

    /// Pointer zones and portrait pairing only exist on desktop.
    pub fn supports_pairing(self) -> bool {
        self == DeviceClass::Desktop
    }

    pub fn tracks_pointer(self) -> bool {
        self == DeviceClass::Desktop
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PointerSide {
    #[default]
    Left,
    Right,
}

impl PointerSide {
    /// The midpoint itself belongs to the right half.
    pub fn from_position(x: f64, width: f64) -> Self {
        if x < width / 2.0 {
            PointerSide::Left
        } else {
            PointerSide::Right
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NavigationKey {
    ArrowLeft,
    ArrowRight,
}

impl NavigationKey {
    pub fn from_key_name(name: &str) -> Option<Self> {
        match name {
            "ArrowLeft" => Some(NavigationKey::ArrowLeft),
            "ArrowRight" => Some(NavigationKey::ArrowRight),
            _ => None,
        }
    }
}

/// Current position and pointer state of one viewer.
#[derive(Debug, Clone)]
pub struct NavigationController {
    current_index: usize,
    pointer_side: PointerSide,
    suspended_over_control: bool,
    device: DeviceClass,
}

impl Default for NavigationController {
    fn default() -> Self {
        Self::new(DeviceClass::Desktop)
    }
}

impl NavigationController {
    pub fn new(device: DeviceClass) -> Self {
        Self {
            current_index: 0,
            pointer_side: PointerSide::Left,
            suspended_over_control: false,
            device,
        }
    }

    pub fn current_index(&self) -> usize {
        self.current_index
    }

    pub fn pointer_side(&self) -> PointerSide {
        self.pointer_side
    }

    pub fn is_suspended_over_control(&self) -> bool {
        self.suspended_over_control
    }

    pub fn device(&self) -> DeviceClass {
        self.device
    }

    pub fn set_device(&mut self, device: DeviceClass) {
        self.device = device;
        if !device.tracks_pointer() {
            self.suspended_over_control = false;
        }
    }

    /// New list: back to the first slide.
    pub fn reset(&mut self) {
        self.current_index = 0;
    }

    /// Same list, new length: keep the position where it still exists.
    pub fn clamp_to(&mut self, len: usize) {
        self.current_index = if len == 0 {
            0
        } else {
            self.current_index % len
        };
    }

    pub fn set_over_video_controls(&mut self, over: bool) {
        self.suspended_over_control = over && self.device.tracks_pointer();
    }

    fn pointer_active(&self) -> bool {
        self.device.tracks_pointer() && !self.suspended_over_control
    }

    pub fn pointer_moved(&mut self, x: f64, width: f64) {
        if self.pointer_active() {
            self.pointer_side = PointerSide::from_position(x, width);
        }
    }

    /// Returns whether the click navigated.
    pub fn click<F>(&mut self, planner: &PairingPlanner<F>) -> bool
    where
        F: Fn(usize) -> bool,
    {
        if !self.pointer_active() || planner.is_empty() {
            return false;
        }
        match self.pointer_side {
            PointerSide::Right => self.advance(planner),
            PointerSide::Left => self.retreat(planner),
        }
        true
    }

    pub fn advance<F>(&mut self, planner: &PairingPlanner<F>)
    where
        F: Fn(usize) -> bool,
    {
        self.current_index = planner.next(self.current_index);
    }

    pub fn retreat<F>(&mut self, planner: &PairingPlanner<F>)
    where
        F: Fn(usize) -> bool,
    {
        self.current_index = planner.prev(self.current_index);
    }

    pub fn goto(&mut self, index: usize, len: usize) {
        if len > 0 {
            self.current_index = index % len;
        }
    }

    pub fn key<F>(&mut self, key: NavigationKey, planner: &PairingPlanner<F>)
    where
        F: Fn(usize) -> bool,
    {
        match key {
            NavigationKey::ArrowRight => self.advance(planner),
            NavigationKey::ArrowLeft => self.retreat(planner),
        }
    }
}

#[cfg(test)]
#[path = "tests/navigation_tests.rs"]
mod tests;
