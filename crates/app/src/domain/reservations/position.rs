//! Queue position resolution.
//!
//! Positions are derived from the stored queue order on every read rather
//! than persisted, so removing an entry renumbers everyone behind it with
//! no compaction step and no stale rank can survive a concurrent change.

use crate::domain::reservations::records::{BuyerUuid, ReservationRecord};

/// 1-based rank of `buyer` within one product's queue.
///
/// `queue` must hold a single product's live entries in canonical order,
/// arrival time then entry id, as the repository returns them. Returns
/// `None` when the buyer holds no entry.
#[must_use]
pub fn queue_position(queue: &[ReservationRecord], buyer: BuyerUuid) -> Option<u32> {
    queue
        .iter()
        .position(|entry| entry.buyer_uuid == buyer)
        .map(|index| index as u32 + 1)
}

/// Whether `buyer` currently holds the front of the queue.
#[must_use]
pub fn is_first(queue: &[ReservationRecord], buyer: BuyerUuid) -> bool {
    queue_position(queue, buyer) == Some(1)
}

#[cfg(test)]
mod tests {
    use jiff::{Timestamp, ToSpan};

    use crate::domain::{
        products::records::ProductUuid, reservations::records::ReservationUuid,
        want_lists::records::WantListUuid,
    };

    use super::*;

    fn entry(buyer: BuyerUuid, queued_at: Timestamp) -> ReservationRecord {
        ReservationRecord {
            uuid: ReservationUuid::new(),
            product_uuid: ProductUuid::new(),
            buyer_uuid: buyer,
            want_list_uuid: WantListUuid::new(),
            queued_at,
        }
    }

    fn queue_of(buyers: &[BuyerUuid]) -> Vec<ReservationRecord> {
        let start = Timestamp::now();

        buyers
            .iter()
            .enumerate()
            .map(|(i, buyer)| entry(*buyer, start + (i as i64).seconds()))
            .collect()
    }

    #[test]
    fn empty_queue_has_no_positions() {
        assert_eq!(queue_position(&[], BuyerUuid::new()), None);
    }

    #[test]
    fn sole_entry_is_first() {
        let buyer = BuyerUuid::new();
        let queue = queue_of(&[buyer]);

        assert_eq!(queue_position(&queue, buyer), Some(1));
        assert!(is_first(&queue, buyer));
    }

    #[test]
    fn absent_buyer_has_no_position() {
        let queue = queue_of(&[BuyerUuid::new(), BuyerUuid::new()]);

        assert_eq!(queue_position(&queue, BuyerUuid::new()), None);
    }

    #[test]
    fn positions_are_a_bijection_onto_dense_ranks() {
        let buyers = [BuyerUuid::new(), BuyerUuid::new(), BuyerUuid::new()];
        let queue = queue_of(&buyers);

        let mut positions: Vec<u32> = buyers
            .iter()
            .filter_map(|buyer| queue_position(&queue, *buyer))
            .collect();
        positions.sort_unstable();

        assert_eq!(positions, vec![1, 2, 3]);
    }

    #[test]
    fn removal_renumbers_everyone_behind() {
        let buyers = [BuyerUuid::new(), BuyerUuid::new(), BuyerUuid::new()];
        let mut queue = queue_of(&buyers);

        queue.remove(0);

        assert_eq!(queue_position(&queue, buyers[0]), None);
        assert_eq!(queue_position(&queue, buyers[1]), Some(1));
        assert_eq!(queue_position(&queue, buyers[2]), Some(2));
    }

    #[test]
    fn only_the_front_counts_as_first() {
        let buyers = [BuyerUuid::new(), BuyerUuid::new()];
        let queue = queue_of(&buyers);

        assert!(is_first(&queue, buyers[0]));
        assert!(!is_first(&queue, buyers[1]));
    }
}
