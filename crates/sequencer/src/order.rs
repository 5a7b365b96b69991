//! Operation ordering
//!
//! The queue order is a pure function of the payload set: fewest
//! dependencies first, then the payloads most others depend on, then media
//! volume (to keep disk swaps down), then product name and finally id. Ids
//! are unique within a run so no two payloads ever compare equal.

use std::cmp::Ordering;

use payseq_types::Payload;

/// Total order used to linearize a run.
#[must_use]
pub fn compare_operations(a: &Payload, b: &Payload) -> Ordering {
    a.required
        .len()
        .cmp(&b.required.len())
        .then_with(|| b.satisfied.len().cmp(&a.satisfied.len()))
        .then_with(|| a.volume_index().cmp(&b.volume_index()))
        .then_with(|| a.product_name.cmp(&b.product_name))
        .then_with(|| a.id.cmp(&b.id))
}

/// Indices into `payloads` in operation order.
///
/// Removal runs use the same order reversed so dependents go before the
/// payloads they depend on.
#[must_use]
pub fn operation_order(payloads: &[&Payload], reverse: bool) -> Vec<usize> {
    let mut order: Vec<usize> = (0..payloads.len()).collect();
    order.sort_by(|&a, &b| compare_operations(payloads[a], payloads[b]));
    if reverse {
        order.reverse();
    }
    order
}

/// Order payloads for presentation: the session driver first, then by
/// product name. Equal names keep their relative order.
pub fn sort_for_display(payloads: &mut [&Payload]) {
    payloads.sort_by(|a, b| match (a.is_driver, b.is_driver) {
        (true, false) => Ordering::Less,
        (false, true) => Ordering::Greater,
        _ => a.product_name.cmp(&b.product_name),
    });
}

/// Dump a payload list to the debug log between BEGIN/END markers.
///
/// `annotate` is appended to each line after a colon.
pub fn log_payload_set<'a, I>(
    header: &str,
    payloads: I,
    annotate: Option<&dyn Fn(&Payload) -> String>,
) where
    I: IntoIterator<Item = &'a Payload>,
{
    let lines: Vec<String> = payloads
        .into_iter()
        .map(|payload| match annotate {
            Some(annotate) => format!("  {}: {}", payload.log_id(), annotate(payload)),
            None => format!("  {}", payload.log_id()),
        })
        .collect();

    if lines.is_empty() {
        tracing::debug!("EMPTY SET {header}");
        return;
    }

    tracing::debug!("BEGIN {header}");
    for line in &lines {
        tracing::debug!("{line}");
    }
    tracing::debug!("END {header}");
}

#[cfg(test)]
mod tests {
    use super::*;
    use payseq_types::{InstallerAction, MediaInfo};

    fn payload(id: &str, name: &str) -> Payload {
        Payload::new(id, name, InstallerAction::Install)
    }

    #[test]
    fn test_fewer_dependencies_first() {
        let x = payload("x", "Zeta").with_satisfied(["y"]);
        let y = payload("y", "Alpha").with_required(["x"]);
        assert_eq!(compare_operations(&x, &y), Ordering::Less);
        assert_eq!(operation_order(&[&y, &x], false), vec![1, 0]);
        assert_eq!(operation_order(&[&y, &x], true), vec![0, 1]);
    }

    #[test]
    fn test_more_dependents_first() {
        let shared = payload("b", "B").with_satisfied(["c", "d"]);
        let leaf = payload("a", "A").with_satisfied(["c"]);
        assert_eq!(compare_operations(&shared, &leaf), Ordering::Less);
    }

    #[test]
    fn test_volume_then_name_then_id() {
        let disk2 = payload("a", "A").with_media(MediaInfo::removable(2, "/media/d2", "Disk 2"));
        let disk1 = payload("b", "B").with_media(MediaInfo::removable(1, "/media/d1", "Disk 1"));
        let no_media = payload("c", "C");
        assert_eq!(compare_operations(&no_media, &disk1), Ordering::Less);
        assert_eq!(compare_operations(&disk1, &disk2), Ordering::Less);

        let same_name_low = payload("{111}", "Same");
        let same_name_high = payload("{222}", "Same");
        assert_eq!(
            compare_operations(&same_name_low, &same_name_high),
            Ordering::Less
        );
        assert_eq!(
            compare_operations(&same_name_low, &same_name_low),
            Ordering::Equal
        );
    }

    #[test]
    fn test_display_order_puts_driver_first() {
        let driver = payload("d", "Suite").as_driver();
        let alpha = payload("a", "Alpha");
        let beta = payload("b", "Beta");
        let mut list = vec![&beta, &driver, &alpha];
        sort_for_display(&mut list);
        let ids: Vec<&str> = list.iter().map(|p| p.id.as_str()).collect();
        assert_eq!(ids, vec!["d", "a", "b"]);
    }
}
