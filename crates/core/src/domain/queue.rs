// Priority-ordered queue
//
// Entries live in an arena of slots linked in both directions. The queue
// tracks the front, the back and the last entry of the priority block, so
// every insertion keeps "priority before normal" without rescanning.

use std::collections::HashMap;
use std::sync::Arc;

use tracing::{error, trace};

use super::entry::{Entry, EntryId, Sequence};
use super::error::{DomainError, Result};
use crate::application::constants::MAX_ID_DERIVATION_ATTEMPTS;
use crate::port::id_provider::{IdProvider, TicketIdProvider};
use crate::port::time_provider::{SystemTimeProvider, TimeProvider};

type SlotIndex = usize;

#[derive(Debug)]
struct Node {
    entry: Entry,
    prev: Option<SlotIndex>,
    next: Option<SlotIndex>,
}

/// Queue where all priority entries precede all normal entries, FIFO within
/// each class.
pub struct PriorityOrderedQueue {
    slots: Vec<Option<Node>>,
    free: Vec<SlotIndex>,
    index: HashMap<EntryId, SlotIndex>,
    head: Option<SlotIndex>,
    tail: Option<SlotIndex>,
    last_priority: Option<SlotIndex>,
    next_sequence: Sequence,
    id_provider: Arc<dyn IdProvider>,
    time_provider: Arc<dyn TimeProvider>,
}

impl std::fmt::Debug for PriorityOrderedQueue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PriorityOrderedQueue")
            .field("entries", &self.iter().map(|e| &e.id).collect::<Vec<_>>())
            .field("next_sequence", &self.next_sequence)
            .finish()
    }
}

impl Default for PriorityOrderedQueue {
    fn default() -> Self {
        Self::new()
    }
}

impl PriorityOrderedQueue {
    /// Create an empty queue with the production ID scheme and system clock
    pub fn new() -> Self {
        Self::with_providers(Arc::new(TicketIdProvider), Arc::new(SystemTimeProvider))
    }

    /// Create an empty queue with injected providers
    ///
    /// # Arguments
    ///
    /// * `id_provider` - Derives entry IDs (injected for determinism)
    /// * `time_provider` - Stamps `enqueued_at` (injected for determinism)
    pub fn with_providers(
        id_provider: Arc<dyn IdProvider>,
        time_provider: Arc<dyn TimeProvider>,
    ) -> Self {
        Self {
            slots: Vec::new(),
            free: Vec::new(),
            index: HashMap::new(),
            head: None,
            tail: None,
            last_priority: None,
            next_sequence: 1,
            id_provider,
            time_provider,
        }
    }

    pub fn len(&self) -> usize {
        self.index.len()
    }

    pub fn is_empty(&self) -> bool {
        self.head.is_none()
    }

    pub fn contains(&self, id: &str) -> bool {
        self.index.contains_key(id)
    }

    pub fn get(&self, id: &str) -> Option<&Entry> {
        self.index
            .get(id)
            .and_then(|&slot| self.node(slot))
            .map(|node| &node.entry)
    }

    /// Sequence number the next enqueue will start from
    pub fn next_sequence(&self) -> Sequence {
        self.next_sequence
    }

    /// Entry at the boundary between the priority block and the normal block
    pub fn last_priority(&self) -> Option<&Entry> {
        self.last_priority
            .and_then(|slot| self.node(slot))
            .map(|node| &node.entry)
    }

    /// Number of entries in the priority block
    pub fn priority_len(&self) -> usize {
        self.iter().take_while(|e| e.is_priority).count()
    }

    /// Add an entry, placing it according to its service class
    ///
    /// Returns the assigned ticket number and the derived ID.
    ///
    /// # Errors
    ///
    /// `DomainError::InvalidInput` if `display_name` is empty or blank.
    pub fn enqueue(
        &mut self,
        display_name: &str,
        is_priority: bool,
    ) -> Result<(Sequence, EntryId)> {
        if display_name.trim().is_empty() {
            return Err(DomainError::InvalidInput(
                "display name must not be empty".to_string(),
            ));
        }

        let (sequence, id) = self.draw_unique_id(display_name);
        let entry = Entry::new(
            id.clone(),
            sequence,
            display_name,
            is_priority,
            self.time_provider.now_millis(),
        );
        let slot = self.alloc(entry);
        self.index.insert(id.clone(), slot);

        match (self.head, is_priority, self.last_priority) {
            (None, _, _) => {
                self.head = Some(slot);
                self.tail = Some(slot);
                if is_priority {
                    self.last_priority = Some(slot);
                }
            }
            (Some(_), false, _) => self.link_after(self.tail, slot),
            (Some(_), true, None) => {
                self.link_front(slot);
                self.last_priority = Some(slot);
            }
            (Some(_), true, Some(boundary)) => {
                self.link_after(Some(boundary), slot);
                self.last_priority = Some(slot);
            }
        }

        trace!(id = %id, sequence, is_priority, "Entry enqueued");
        Ok((sequence, id))
    }

    /// Remove and return the front entry, or `None` when empty
    pub fn dequeue(&mut self) -> Option<Entry> {
        let slot = self.head?;
        self.unlink(slot)
    }

    /// Remove the entry with the given ID
    ///
    /// Returns `false` when the ID is not queued. Removing the front is the
    /// same as `dequeue`.
    pub fn remove_by_id(&mut self, id: &str) -> bool {
        let Some(&slot) = self.index.get(id) else {
            return false;
        };

        if Some(slot) == self.head {
            self.dequeue();
            return true;
        }

        let reachable = self.check_reachable(slot);
        if let Err(e) = &reachable {
            error!(id = %id, error = %e, "Refusing to remove unreachable entry");
        }
        // In debug builds this panics while a ServiceDesk caller holds the
        // queue lock, which poisons it: later desk calls return Internal.
        debug_assert!(reachable.is_ok(), "{}", reachable.as_ref().unwrap_err());
        if reachable.is_err() {
            return false;
        }

        self.unlink(slot).is_some()
    }

    /// Front entry without removing it
    pub fn peek_front(&self) -> Option<&Entry> {
        self.head.and_then(|slot| self.node(slot)).map(|node| &node.entry)
    }

    /// Front-to-back copy of the queue
    pub fn to_ordered_list(&self) -> Vec<Entry> {
        self.iter().cloned().collect()
    }

    /// Borrowing front-to-back iterator
    pub fn iter(&self) -> Iter<'_> {
        Iter {
            queue: self,
            cursor: self.head,
            remaining: self.len(),
        }
    }

    /// 1-based position of an entry
    pub fn position_of(&self, id: &str) -> Option<usize> {
        if !self.contains(id) {
            return None;
        }
        self.iter().position(|e| e.id == id).map(|i| i + 1)
    }

    /// Drop every entry. Ticket numbering keeps counting.
    pub fn clear(&mut self) {
        self.slots.clear();
        self.free.clear();
        self.index.clear();
        self.head = None;
        self.tail = None;
        self.last_priority = None;
    }

    /// Walk the whole structure and verify links, index and ordering
    pub fn check_invariants(&self) -> Result<()> {
        let mut seen = 0usize;
        let mut prev: Option<SlotIndex> = None;
        let mut cursor = self.head;
        let mut in_priority_block = true;
        let mut boundary: Option<SlotIndex> = None;

        while let Some(slot) = cursor {
            let node = self
                .node(slot)
                .ok_or_else(|| DomainError::Inconsistent(format!("dangling link to slot {}", slot)))?;
            if node.prev != prev {
                return Err(DomainError::Inconsistent(format!(
                    "broken back link at {}",
                    node.entry.id
                )));
            }
            if self.index.get(&node.entry.id) != Some(&slot) {
                return Err(DomainError::Inconsistent(format!(
                    "index does not point at {}",
                    node.entry.id
                )));
            }
            if node.entry.is_priority {
                if !in_priority_block {
                    return Err(DomainError::Inconsistent(format!(
                        "priority entry {} behind a normal entry",
                        node.entry.id
                    )));
                }
                boundary = Some(slot);
            } else {
                in_priority_block = false;
            }

            seen += 1;
            if seen > self.index.len() {
                return Err(DomainError::Inconsistent("cycle in queue links".to_string()));
            }
            prev = cursor;
            cursor = node.next;
        }

        if seen != self.index.len() {
            return Err(DomainError::Inconsistent(format!(
                "{} entries indexed, {} reachable",
                self.index.len(),
                seen
            )));
        }
        if prev != self.tail {
            return Err(DomainError::Inconsistent("tail is not the last entry".to_string()));
        }
        if boundary != self.last_priority {
            return Err(DomainError::Inconsistent(
                "last-priority tracker out of date".to_string(),
            ));
        }
        Ok(())
    }

    // ------------------------------------------------------------------------
    // Internals
    // ------------------------------------------------------------------------

    fn node(&self, slot: SlotIndex) -> Option<&Node> {
        self.slots.get(slot).and_then(Option::as_ref)
    }

    fn node_mut(&mut self, slot: SlotIndex) -> Option<&mut Node> {
        self.slots.get_mut(slot).and_then(Option::as_mut)
    }

    fn draw_unique_id(&mut self, display_name: &str) -> (Sequence, EntryId) {
        let mut attempts = 0;
        loop {
            let sequence = self.next_sequence;
            self.next_sequence += 1;

            // A provider that keeps colliding is bypassed for the ticket scheme,
            // which always heals because sequences are never reused.
            let id = if attempts < MAX_ID_DERIVATION_ATTEMPTS {
                self.id_provider.derive_id(sequence, display_name)
            } else {
                TicketIdProvider.derive_id(sequence, display_name)
            };
            if !self.index.contains_key(&id) {
                return (sequence, id);
            }
            attempts += 1;
            trace!(id = %id, attempts, "Entry ID collision, drawing a new ticket");
        }
    }

    fn alloc(&mut self, entry: Entry) -> SlotIndex {
        let node = Node {
            entry,
            prev: None,
            next: None,
        };
        match self.free.pop() {
            Some(slot) => {
                self.slots[slot] = Some(node);
                slot
            }
            None => {
                self.slots.push(Some(node));
                self.slots.len() - 1
            }
        }
    }

    fn link_front(&mut self, slot: SlotIndex) {
        let old_head = self.head;
        if let Some(node) = self.node_mut(slot) {
            node.prev = None;
            node.next = old_head;
        }
        if let Some(old) = old_head.and_then(|h| self.node_mut(h)) {
            old.prev = Some(slot);
        }
        self.head = Some(slot);
        if self.tail.is_none() {
            self.tail = Some(slot);
        }
    }

    /// Insert `slot` right after `after`; `None` means "at the front"
    fn link_after(&mut self, after: Option<SlotIndex>, slot: SlotIndex) {
        let Some(after) = after else {
            self.link_front(slot);
            return;
        };
        let successor = self.node(after).and_then(|n| n.next);
        if let Some(node) = self.node_mut(slot) {
            node.prev = Some(after);
            node.next = successor;
        }
        if let Some(node) = self.node_mut(after) {
            node.next = Some(slot);
        }
        match successor {
            Some(s) => {
                if let Some(node) = self.node_mut(s) {
                    node.prev = Some(slot);
                }
            }
            None => self.tail = Some(slot),
        }
    }

    /// Verify the slot is linked in from its predecessor
    fn check_reachable(&self, slot: SlotIndex) -> Result<()> {
        let node = self
            .node(slot)
            .ok_or_else(|| DomainError::Inconsistent(format!("slot {} is empty", slot)))?;
        let linked = match node.prev {
            Some(p) => self.node(p).and_then(|pred| pred.next) == Some(slot),
            None => self.head == Some(slot),
        };
        if linked {
            Ok(())
        } else {
            Err(DomainError::Inconsistent(format!(
                "entry {} is unreachable from the front",
                node.entry.id
            )))
        }
    }

    /// Detach a linked slot and return its entry
    fn unlink(&mut self, slot: SlotIndex) -> Option<Entry> {
        let node = self.slots.get_mut(slot)?.take()?;
        self.free.push(slot);
        self.index.remove(&node.entry.id);

        match node.prev {
            Some(p) => {
                if let Some(pred) = self.node_mut(p) {
                    pred.next = node.next;
                }
            }
            None => self.head = node.next,
        }
        match node.next {
            Some(n) => {
                if let Some(succ) = self.node_mut(n) {
                    succ.prev = node.prev;
                }
            }
            None => self.tail = node.prev,
        }

        if self.head.is_none() {
            self.tail = None;
            self.last_priority = None;
        } else if self.last_priority == Some(slot) {
            self.last_priority = self.scan_priority_block();
        }

        Some(node.entry)
    }

    /// Last slot of the priority prefix, walking only while entries are priority
    fn scan_priority_block(&self) -> Option<SlotIndex> {
        let mut last = None;
        let mut cursor = self.head;
        while let Some(node) = cursor.and_then(|slot| self.node(slot)) {
            if !node.entry.is_priority {
                break;
            }
            last = cursor;
            cursor = node.next;
        }
        last
    }
}

/// Front-to-back iterator over a `PriorityOrderedQueue`
pub struct Iter<'a> {
    queue: &'a PriorityOrderedQueue,
    cursor: Option<SlotIndex>,
    remaining: usize,
}

impl<'a> Iterator for Iter<'a> {
    type Item = &'a Entry;

    fn next(&mut self) -> Option<Self::Item> {
        if self.remaining == 0 {
            return None;
        }
        let node = self.queue.node(self.cursor?)?;
        self.cursor = node.next;
        self.remaining -= 1;
        Some(&node.entry)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        (0, Some(self.remaining))
    }
}

impl<'a> IntoIterator for &'a PriorityOrderedQueue {
    type Item = &'a Entry;
    type IntoIter = Iter<'a>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::port::id_provider::mocks::{CollidingIdProvider, ConstantIdProvider};
    use crate::port::time_provider::mocks::FixedTimeProvider;

    fn test_queue() -> PriorityOrderedQueue {
        PriorityOrderedQueue::with_providers(
            Arc::new(TicketIdProvider),
            Arc::new(FixedTimeProvider::new(1000)),
        )
    }

    fn names(queue: &PriorityOrderedQueue) -> Vec<String> {
        queue.iter().map(|e| e.display_name.clone()).collect()
    }

    #[test]
    fn test_empty_queue() {
        let mut queue = test_queue();
        assert!(queue.is_empty());
        assert_eq!(queue.len(), 0);
        assert!(queue.peek_front().is_none());
        assert!(queue.dequeue().is_none());
        assert!(queue.to_ordered_list().is_empty());
        assert!(queue.check_invariants().is_ok());
    }

    #[test]
    fn test_enqueue_rejects_blank_names() {
        let mut queue = test_queue();
        assert!(matches!(
            queue.enqueue("", false),
            Err(DomainError::InvalidInput(_))
        ));
        assert!(matches!(
            queue.enqueue("   ", true),
            Err(DomainError::InvalidInput(_))
        ));
        assert!(queue.is_empty());
        // Rejected names do not consume tickets
        assert_eq!(queue.next_sequence(), 1);
    }

    #[test]
    fn test_enqueue_assigns_ticket_ids() {
        let mut queue = test_queue();
        let (seq, id) = queue.enqueue("Ana", false).unwrap();
        assert_eq!(seq, 1);
        assert_eq!(id, "1:Ana");

        let (seq, id) = queue.enqueue("Ana", false).unwrap();
        assert_eq!(seq, 2);
        assert_eq!(id, "2:Ana");

        let front = queue.peek_front().unwrap();
        assert_eq!(front.enqueued_at, 1000);
        assert!(!front.is_priority);
    }

    #[test]
    fn test_first_priority_jumps_to_front() {
        let mut queue = test_queue();
        queue.enqueue("Ana", false).unwrap();
        queue.enqueue("Bia", false).unwrap();
        queue.enqueue("Caio", true).unwrap();

        assert_eq!(names(&queue), vec!["Caio", "Ana", "Bia"]);
        assert_eq!(queue.last_priority().unwrap().display_name, "Caio");
        assert!(queue.check_invariants().is_ok());
    }

    #[test]
    fn test_priority_spliced_at_boundary() {
        let mut queue = test_queue();
        queue.enqueue("Ana", false).unwrap();
        queue.enqueue("Bia", true).unwrap();
        queue.enqueue("Caio", true).unwrap();
        queue.enqueue("Davi", false).unwrap();
        queue.enqueue("Eva", true).unwrap();

        assert_eq!(names(&queue), vec!["Bia", "Caio", "Eva", "Ana", "Davi"]);
        assert_eq!(queue.priority_len(), 3);
        assert!(queue.check_invariants().is_ok());
    }

    #[test]
    fn test_priority_after_priority_tail_becomes_back() {
        let mut queue = test_queue();
        queue.enqueue("Ana", true).unwrap();
        queue.enqueue("Bia", true).unwrap();

        assert_eq!(names(&queue), vec!["Ana", "Bia"]);
        queue.enqueue("Caio", false).unwrap();
        assert_eq!(names(&queue), vec!["Ana", "Bia", "Caio"]);
        assert!(queue.check_invariants().is_ok());
    }

    #[test]
    fn test_dequeue_recomputes_tracker() {
        let mut queue = test_queue();
        queue.enqueue("Ana", true).unwrap();
        queue.enqueue("Bia", false).unwrap();

        let served = queue.dequeue().unwrap();
        assert_eq!(served.display_name, "Ana");
        assert!(queue.last_priority().is_none());

        // Next priority must go ahead of Bia again
        queue.enqueue("Caio", true).unwrap();
        assert_eq!(names(&queue), vec!["Caio", "Bia"]);
        assert!(queue.check_invariants().is_ok());
    }

    #[test]
    fn test_dequeue_last_entry_resets_pointers() {
        let mut queue = test_queue();
        queue.enqueue("Ana", true).unwrap();
        queue.dequeue().unwrap();

        assert!(queue.is_empty());
        assert!(queue.last_priority().is_none());
        queue.enqueue("Bia", false).unwrap();
        assert_eq!(names(&queue), vec!["Bia"]);
        assert!(queue.check_invariants().is_ok());
    }

    #[test]
    fn test_remove_tracker_from_middle_of_priority_block() {
        let mut queue = test_queue();
        queue.enqueue("Ana", true).unwrap();
        let (_, bia) = queue.enqueue("Bia", true).unwrap();
        queue.enqueue("Caio", false).unwrap();

        assert!(queue.remove_by_id(&bia));
        assert_eq!(queue.last_priority().unwrap().display_name, "Ana");

        queue.enqueue("Davi", true).unwrap();
        assert_eq!(names(&queue), vec!["Ana", "Davi", "Caio"]);
        assert!(queue.check_invariants().is_ok());
    }

    #[test]
    fn test_remove_back_moves_tail() {
        let mut queue = test_queue();
        queue.enqueue("Ana", false).unwrap();
        let (_, bia) = queue.enqueue("Bia", false).unwrap();

        assert!(queue.remove_by_id(&bia));
        queue.enqueue("Caio", false).unwrap();
        assert_eq!(names(&queue), vec!["Ana", "Caio"]);
        assert!(queue.check_invariants().is_ok());
    }

    #[test]
    fn test_remove_unknown_id() {
        let mut queue = test_queue();
        queue.enqueue("Ana", false).unwrap();
        assert!(!queue.remove_by_id("99:Nobody"));
        assert_eq!(names(&queue), vec!["Ana"]);
    }

    #[test]
    fn test_remove_front_is_dequeue() {
        let mut queue = test_queue();
        let (_, ana) = queue.enqueue("Ana", true).unwrap();
        queue.enqueue("Bia", false).unwrap();

        assert!(queue.remove_by_id(&ana));
        assert_eq!(names(&queue), vec!["Bia"]);
        assert!(queue.last_priority().is_none());
        assert!(queue.check_invariants().is_ok());
    }

    #[test]
    fn test_slots_are_reused() {
        let mut queue = test_queue();
        for round in 0..10 {
            queue.enqueue(&format!("p{}", round), round % 2 == 0).unwrap();
            queue.enqueue(&format!("q{}", round), false).unwrap();
            queue.dequeue().unwrap();
        }
        assert_eq!(queue.len(), 10);
        assert!(queue.slots.len() <= 11);
        assert!(queue.check_invariants().is_ok());
    }

    #[test]
    fn test_clear_keeps_sequence() {
        let mut queue = test_queue();
        queue.enqueue("Ana", false).unwrap();
        queue.enqueue("Bia", true).unwrap();
        queue.clear();

        assert!(queue.is_empty());
        assert!(queue.last_priority().is_none());
        let (seq, id) = queue.enqueue("Ana", false).unwrap();
        assert_eq!(seq, 3);
        assert_eq!(id, "3:Ana");
    }

    #[test]
    fn test_position_of() {
        let mut queue = test_queue();
        let (_, ana) = queue.enqueue("Ana", false).unwrap();
        let (_, bia) = queue.enqueue("Bia", true).unwrap();

        assert_eq!(queue.position_of(&bia), Some(1));
        assert_eq!(queue.position_of(&ana), Some(2));
        assert_eq!(queue.position_of("0:Ghost"), None);
    }

    #[test]
    fn test_iter_is_restartable() {
        let mut queue = test_queue();
        queue.enqueue("Ana", false).unwrap();
        queue.enqueue("Bia", false).unwrap();

        let first: Vec<_> = queue.iter().map(|e| e.id.clone()).collect();
        let second: Vec<_> = (&queue).into_iter().map(|e| e.id.clone()).collect();
        assert_eq!(first, second);
        assert_eq!(queue.len(), 2);
    }

    #[test]
    fn test_colliding_ids_draw_new_tickets() {
        let mut queue = PriorityOrderedQueue::with_providers(
            Arc::new(CollidingIdProvider::new(2)),
            Arc::new(FixedTimeProvider::new(0)),
        );
        // First call yields "Ana", second collides with it and falls through
        let (seq, id) = queue.enqueue("Ana", false).unwrap();
        assert_eq!((seq, id.as_str()), (1, "Ana"));

        let (seq, id) = queue.enqueue("Ana", false).unwrap();
        assert_eq!(seq, 3);
        assert_eq!(id, "3:Ana");
        assert_eq!(queue.len(), 2);
    }

    #[test]
    fn test_constant_provider_never_loops_forever() {
        let mut queue = PriorityOrderedQueue::with_providers(
            Arc::new(ConstantIdProvider("same".to_string())),
            Arc::new(FixedTimeProvider::new(0)),
        );
        let (_, first) = queue.enqueue("Ana", false).unwrap();
        let (_, second) = queue.enqueue("Bia", false).unwrap();
        assert_eq!(first, "same");
        assert_ne!(first, second);
        assert!(second.ends_with(":Bia"));
    }

    #[cfg(debug_assertions)]
    #[test]
    #[should_panic(expected = "unreachable from the front")]
    fn test_unreachable_entry_fails_loudly_in_debug() {
        let mut queue = test_queue();
        queue.enqueue("Ana", false).unwrap();
        queue.enqueue("Bia", false).unwrap();
        let (_, caio) = queue.enqueue("Caio", false).unwrap();

        // Cut Bia -> Caio so Caio is indexed but not reachable
        let bia_slot = queue.index["2:Bia"];
        queue.slots[bia_slot].as_mut().unwrap().next = None;
        queue.remove_by_id(&caio);
    }

    #[cfg(not(debug_assertions))]
    #[test]
    fn test_unreachable_entry_left_in_place_in_release() {
        let mut queue = test_queue();
        queue.enqueue("Ana", false).unwrap();
        queue.enqueue("Bia", false).unwrap();
        let (_, caio) = queue.enqueue("Caio", false).unwrap();

        let bia_slot = queue.index["2:Bia"];
        queue.slots[bia_slot].as_mut().unwrap().next = None;
        assert!(!queue.remove_by_id(&caio));
        assert!(queue.contains(&caio));
        assert_eq!(names(&queue), vec!["Ana", "Bia"]);
    }

    #[test]
    fn test_check_invariants_detects_misplaced_priority() {
        let mut queue = test_queue();
        queue.enqueue("Ana", false).unwrap();
        queue.enqueue("Bia", false).unwrap();

        let bia_slot = queue.index["2:Bia"];
        queue.slots[bia_slot].as_mut().unwrap().entry.is_priority = true;
        assert!(matches!(
            queue.check_invariants(),
            Err(DomainError::Inconsistent(_))
        ));
    }
}
