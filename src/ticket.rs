//! FIFO admission tickets with abandoned-ticket skipping.
//!
//! Admission order is decided at request time: every blocking acquire draws
//! the ticket at `head`, and the lock serves tickets strictly in order from
//! `tail`. A waiter that gives up before being served marks its ticket dead;
//! [`TicketQueue::advance_tail`] sweeps dead tickets so a vanished waiter
//! can never stall the sessions queued behind it.

use std::collections::HashSet;

/// Ticket counters and the dead-ticket set for one lock queue.
///
/// Counter arithmetic wraps. All comparisons are equality-only, so a wrapped
/// counter pair behaves identically as long as fewer than `u32::MAX` tickets
/// are outstanding at once, which the waiter bookkeeping guarantees by
/// holding one entry per outstanding ticket.
#[derive(Debug, Default)]
pub struct TicketQueue {
    /// Next ticket to issue.
    head: u32,
    /// Ticket currently eligible for service.
    tail: u32,
    /// Tickets abandoned before service, not yet swept past.
    dead: HashSet<u32>,
}

impl TicketQueue {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Draw the next admission ticket.
    pub fn next_ticket(&mut self) -> u32 {
        let ticket = self.head;
        self.head = self.head.wrapping_add(1);
        ticket
    }

    /// Abandon a ticket whose waiter gave up before service.
    ///
    /// The ticket stays in the dead set until the tail sweeps past it.
    pub fn mark_dead(&mut self, ticket: u32) {
        self.dead.insert(ticket);
    }

    /// Sweep the tail past any run of dead tickets.
    ///
    /// Runs before every predicate evaluation. Each dead ticket is removed
    /// exactly once as the tail passes it, so the dead set is bounded by the
    /// number of outstanding abandoned waits.
    pub fn advance_tail(&mut self) {
        while self.dead.remove(&self.tail) {
            self.tail = self.tail.wrapping_add(1);
        }
    }

    /// Consume the serving ticket after a grant.
    pub fn retire_serving(&mut self) {
        self.tail = self.tail.wrapping_add(1);
    }

    /// Next ticket to issue.
    #[must_use]
    pub const fn head(&self) -> u32 {
        self.head
    }

    /// Ticket currently eligible for service.
    #[must_use]
    pub const fn tail(&self) -> u32 {
        self.tail
    }

    /// True when no ticket is outstanding.
    ///
    /// Call [`advance_tail`](Self::advance_tail) first when "outstanding"
    /// should mean live waiters rather than unswept dead tickets.
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.head == self.tail
    }

    /// Tickets in `[tail, head)`: live waiters plus unswept dead tickets.
    #[must_use]
    pub const fn outstanding(&self) -> u32 {
        self.head.wrapping_sub(self.tail)
    }

    /// Abandoned tickets not yet swept.
    #[must_use]
    pub fn dead_len(&self) -> usize {
        self.dead.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tickets_issue_in_sequence() {
        let mut q = TicketQueue::new();
        assert!(q.is_empty());
        assert_eq!(q.next_ticket(), 0);
        assert_eq!(q.next_ticket(), 1);
        assert_eq!(q.next_ticket(), 2);
        assert_eq!(q.outstanding(), 3);
        assert!(!q.is_empty());
    }

    #[test]
    fn retire_advances_service_by_one() {
        let mut q = TicketQueue::new();
        let first = q.next_ticket();
        let second = q.next_ticket();

        assert_eq!(q.tail(), first);
        q.retire_serving();
        assert_eq!(q.tail(), second);
        q.retire_serving();
        assert!(q.is_empty());
    }

    #[test]
    fn advance_tail_sweeps_dead_run() {
        let mut q = TicketQueue::new();
        let t0 = q.next_ticket();
        let t1 = q.next_ticket();
        let t2 = q.next_ticket();

        // Abandon the first two, out of order.
        q.mark_dead(t1);
        q.mark_dead(t0);
        assert_eq!(q.dead_len(), 2);

        q.advance_tail();
        assert_eq!(q.tail(), t2);
        assert_eq!(q.dead_len(), 0);
        assert_eq!(q.outstanding(), 1);
    }

    #[test]
    fn advance_tail_stops_at_live_ticket() {
        let mut q = TicketQueue::new();
        let t0 = q.next_ticket();
        let t1 = q.next_ticket();
        let t2 = q.next_ticket();

        // Abandon t0 and t2; t1 is live and must block the sweep.
        q.mark_dead(t0);
        q.mark_dead(t2);

        q.advance_tail();
        assert_eq!(q.tail(), t1);
        assert_eq!(q.dead_len(), 1, "t2 stays dead until the tail reaches it");

        // t1 is served; the sweep then consumes t2.
        q.retire_serving();
        q.advance_tail();
        assert!(q.is_empty());
        assert_eq!(q.dead_len(), 0);
    }

    #[test]
    fn advance_tail_without_dead_is_a_no_op() {
        let mut q = TicketQueue::new();
        q.next_ticket();
        let before = q.tail();
        q.advance_tail();
        assert_eq!(q.tail(), before);
    }

    #[test]
    fn counters_wrap_safely() {
        let mut q = TicketQueue {
            head: u32::MAX,
            tail: u32::MAX,
            dead: HashSet::new(),
        };

        assert!(q.is_empty());
        let t = q.next_ticket();
        assert_eq!(t, u32::MAX);
        assert_eq!(q.head(), 0, "head wraps to zero");
        assert_eq!(q.outstanding(), 1);

        q.retire_serving();
        assert_eq!(q.tail(), 0);
        assert!(q.is_empty());
    }

    #[test]
    fn dead_sweep_crosses_the_wrap_boundary() {
        let mut q = TicketQueue {
            head: u32::MAX - 1,
            tail: u32::MAX - 1,
            dead: HashSet::new(),
        };

        let a = q.next_ticket(); // MAX - 1
        let b = q.next_ticket(); // MAX
        let c = q.next_ticket(); // 0

        q.mark_dead(a);
        q.mark_dead(b);
        q.advance_tail();
        assert_eq!(q.tail(), c);
        assert_eq!(q.outstanding(), 1);
    }
}
