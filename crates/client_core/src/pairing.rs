use crate::navigation::DeviceClass;

/// Decides which slides pair two adjacent portraits and how indices step.
///
/// `is_portrait` answers for a display index; pending or unknown
/// classifications must answer `false`.
pub struct PairingPlanner<F> {
    len: usize,
    device: DeviceClass,
    is_portrait: F,
}

impl<F> PairingPlanner<F>
where
    F: Fn(usize) -> bool,
{
    pub fn new(len: usize, device: DeviceClass, is_portrait: F) -> Self {
        Self {
            len,
            device,
            is_portrait,
        }
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Items `i` and `i + 1` form one slide. Never wraps past the end.
    pub fn can_pair(&self, i: usize) -> bool {
        self.device.supports_pairing()
            && i + 1 < self.len
            && (self.is_portrait)(i)
            && (self.is_portrait)(i + 1)
    }

    pub fn next(&self, i: usize) -> usize {
        if self.len == 0 {
            return 0;
        }
        let step = if self.can_pair(i) { 2 } else { 1 };
        (i + step) % self.len
    }

    pub fn prev(&self, i: usize) -> usize {
        if self.len == 0 {
            return 0;
        }
        let i = i % self.len;
        let two_back = (i + 2 * self.len - 2) % self.len;
        let step = if self.can_pair(two_back) { 2 } else { 1 };
        (i + 2 * self.len - step) % self.len
    }
}

#[cfg(test)]
#[path = "tests/pairing_tests.rs"]
mod tests;
