/// Opaque handle to something the map widget rendered (marker or polygon).
///
/// Handles are issued by the host and are only meaningful to the host that issued them.
#[derive(Copy, Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct WidgetHandle(pub u64);

/// Opaque handle to a click listener registered on a widget.
#[derive(Copy, Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ListenerHandle(pub u64);

/// Monotonic handle allocator shared by host implementations.
#[derive(Debug, Default, Clone)]
pub struct HandleAllocator {
    next: u64,
}

impl HandleAllocator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn next_widget(&mut self) -> WidgetHandle {
        self.next += 1;
        WidgetHandle(self.next)
    }

    pub fn next_listener(&mut self) -> ListenerHandle {
        self.next += 1;
        ListenerHandle(self.next)
    }
}
