/// Receives iteration events from a solver loop and may steer it.
///
/// The trim loop and the case sweep both report progress through an
/// observer, so callers can log, record histories, or stop early without
/// the loops knowing about any of that.
///
/// Returning `Some(action)` requests a loop-specific action; `None` lets the
/// loop carry on. Closures implement this trait, and `()` is the no-op
/// observer.
pub trait Observer<E, A> {
    /// Inspects one event and optionally returns a control action.
    fn observe(&mut self, event: &E) -> Option<A>;
}

impl<E, A, F> Observer<E, A> for F
where
    F: FnMut(&E) -> Option<A>,
{
    fn observe(&mut self, event: &E) -> Option<A> {
        self(event)
    }
}

impl<E, A> Observer<E, A> for () {
    fn observe(&mut self, _event: &E) -> Option<A> {
        None
    }
}
