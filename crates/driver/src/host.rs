use std::cell::Cell;
use std::collections::BTreeSet;
use std::rc::Rc;
use std::time::{Duration, Instant};

use backdrop_common::LogicalSize;

/// A scheduled per-frame callback.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct TickHandle(pub u64);

/// A resize subscription.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ListenerId(pub u64);

/// The embedding environment: frame scheduling, resize notification and window metrics.
///
/// The driver subscribes at most one resize listener and keeps at most one
/// tick pending at a time. A host only delivers resize notifications while a
/// listener is registered.
pub trait FrameHost {
    /// Ask for one tick on the next frame.
    fn request_tick(&mut self) -> TickHandle;

    fn cancel_tick(&mut self, handle: TickHandle);

    fn add_resize_listener(&mut self) -> ListenerId;

    fn remove_resize_listener(&mut self, id: ListenerId);

    fn logical_size(&self) -> LogicalSize;

    /// Raw, unclamped device pixel ratio.
    fn device_pixel_ratio(&self) -> f64;
}

impl<T: FrameHost + ?Sized> FrameHost for &mut T {
    fn request_tick(&mut self) -> TickHandle {
        (**self).request_tick()
    }

    fn cancel_tick(&mut self, handle: TickHandle) {
        (**self).cancel_tick(handle)
    }

    fn add_resize_listener(&mut self) -> ListenerId {
        (**self).add_resize_listener()
    }

    fn remove_resize_listener(&mut self, id: ListenerId) {
        (**self).remove_resize_listener(id)
    }

    fn logical_size(&self) -> LogicalSize {
        (**self).logical_size()
    }

    fn device_pixel_ratio(&self) -> f64 {
        (**self).device_pixel_ratio()
    }
}

/// Monotonic time source. Readings are offsets from an arbitrary epoch.
pub trait Clock {
    fn now(&self) -> Duration;
}

#[derive(Debug, Clone, Copy)]
pub struct SystemClock {
    origin: Instant,
}

impl SystemClock {
    pub fn new() -> Self {
        Self {
            origin: Instant::now(),
        }
    }

    /// Wall-clock instant of a reading taken from this clock.
    pub fn instant_at(&self, reading: Duration) -> Instant {
        self.origin + reading
    }
}

impl Default for SystemClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for SystemClock {
    fn now(&self) -> Duration {
        self.origin.elapsed()
    }
}

/// Hand-driven clock. Clones share the same reading.
#[derive(Debug, Clone, Default)]
pub struct ManualClock {
    now: Rc<Cell<Duration>>,
}

impl ManualClock {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn advance(&self, by: Duration) {
        self.now.set(self.now.get() + by);
    }

    pub fn set(&self, to: Duration) {
        self.now.set(to);
    }
}

impl Clock for ManualClock {
    fn now(&self) -> Duration {
        self.now.get()
    }
}

/// In-memory host that counts what is registered with it.
#[derive(Debug, Clone)]
pub struct TestHost {
    size: LogicalSize,
    device_pixel_ratio: f64,
    next_id: u64,
    pending_ticks: BTreeSet<TickHandle>,
    listeners: BTreeSet<ListenerId>,
    tick_requests: u64,
}

impl TestHost {
    pub fn new(size: LogicalSize, device_pixel_ratio: f64) -> Self {
        Self {
            size,
            device_pixel_ratio,
            next_id: 0,
            pending_ticks: BTreeSet::new(),
            listeners: BTreeSet::new(),
            tick_requests: 0,
        }
    }

    /// Change window metrics. Returns true when a listener would be notified.
    pub fn resize(&mut self, size: LogicalSize, device_pixel_ratio: f64) -> bool {
        self.size = size;
        self.device_pixel_ratio = device_pixel_ratio;
        !self.listeners.is_empty()
    }

    /// Fire the oldest pending tick, removing it from the schedule.
    pub fn fire_tick(&mut self) -> Option<TickHandle> {
        self.pending_ticks.pop_first()
    }

    pub fn pending_ticks(&self) -> usize {
        self.pending_ticks.len()
    }

    pub fn resize_listeners(&self) -> usize {
        self.listeners.len()
    }

    pub fn tick_requests(&self) -> u64 {
        self.tick_requests
    }

    fn allocate_id(&mut self) -> u64 {
        self.next_id += 1;
        self.next_id
    }
}

impl FrameHost for TestHost {
    fn request_tick(&mut self) -> TickHandle {
        let handle = TickHandle(self.allocate_id());
        self.pending_ticks.insert(handle);
        self.tick_requests += 1;
        handle
    }

    fn cancel_tick(&mut self, handle: TickHandle) {
        self.pending_ticks.remove(&handle);
    }

    fn add_resize_listener(&mut self) -> ListenerId {
        let id = ListenerId(self.allocate_id());
        self.listeners.insert(id);
        id
    }

    fn remove_resize_listener(&mut self, id: ListenerId) {
        self.listeners.remove(&id);
    }

    fn logical_size(&self) -> LogicalSize {
        self.size
    }

    fn device_pixel_ratio(&self) -> f64 {
        self.device_pixel_ratio
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn manual_clock_clones_share_time() {
        let clock = ManualClock::new();
        let view = clock.clone();
        clock.advance(Duration::from_millis(250));
        assert_eq!(view.now(), Duration::from_millis(250));
        view.set(Duration::from_secs(3));
        assert_eq!(clock.now(), Duration::from_secs(3));
    }

    #[test]
    fn system_clock_is_monotonic() {
        let clock = SystemClock::new();
        let a = clock.now();
        let b = clock.now();
        assert!(b >= a);
    }

    #[test]
    fn system_clock_readings_map_back_to_instants() {
        let clock = SystemClock::new();
        let reading = clock.now();
        let at = clock.instant_at(reading);
        assert!(at <= Instant::now());
        let later = clock.instant_at(reading + Duration::from_millis(5));
        assert_eq!(later - at, Duration::from_millis(5));
    }

    #[test]
    fn borrowed_host_forwards_to_the_owner() {
        fn register<H: FrameHost>(mut host: H) -> f64 {
            host.request_tick();
            host.add_resize_listener();
            host.device_pixel_ratio()
        }

        let mut host = TestHost::new(LogicalSize::new(10.0, 10.0), 1.5);
        assert_eq!(register(&mut host), 1.5);
        assert_eq!(host.pending_ticks(), 1);
        assert_eq!(host.resize_listeners(), 1);
    }

    #[test]
    fn test_host_counts_registrations() {
        let mut host = TestHost::new(LogicalSize::new(100.0, 50.0), 1.0);
        let a = host.request_tick();
        let b = host.request_tick();
        let l = host.add_resize_listener();
        assert_eq!(host.pending_ticks(), 2);
        assert_eq!(host.resize_listeners(), 1);

        assert_eq!(host.fire_tick(), Some(a));
        host.cancel_tick(b);
        host.remove_resize_listener(l);
        assert_eq!(host.pending_ticks(), 0);
        assert_eq!(host.resize_listeners(), 0);
        assert_eq!(host.fire_tick(), None);
        assert_eq!(host.tick_requests(), 2);
    }

    #[test]
    fn resize_reports_listener_presence() {
        let mut host = TestHost::new(LogicalSize::new(100.0, 50.0), 1.0);
        assert!(!host.resize(LogicalSize::new(200.0, 100.0), 2.0));
        host.add_resize_listener();
        assert!(host.resize(LogicalSize::new(300.0, 100.0), 2.0));
        assert_eq!(host.logical_size(), LogicalSize::new(300.0, 100.0));
        assert_eq!(host.device_pixel_ratio(), 2.0);
    }
}
