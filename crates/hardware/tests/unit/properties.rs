//! Property-based checks.
//!
//! WAW resolution ownership, `vtype` round-trips, and register file
//! write/read faithfulness under arbitrary inputs.

use proptest::prelude::*;

use vexsim_core::rvv::interface::VectorConfigState;
use vexsim_core::rvv::regfile::VectorRegFile;
use vexsim_core::rvv::retire::resolve_group;

proptest! {
    /// After resolution, each byte is enabled for at most one writer, and
    /// that writer is the youngest whose original enable covered the byte.
    #[test]
    fn prop_waw_resolution_assigns_bytes_to_youngest(
        enables in prop::collection::vec(prop::collection::vec(any::<bool>(), 8), 1..5)
    ) {
        let resolved = resolve_group(&enables);
        prop_assert_eq!(resolved.len(), enables.len());
        for byte in 0..8 {
            let owners: Vec<usize> = resolved
                .iter()
                .enumerate()
                .filter(|(_, e)| e[byte])
                .map(|(i, _)| i)
                .collect();
            prop_assert!(owners.len() <= 1);
            let youngest = enables.iter().rposition(|e| e[byte]);
            match youngest {
                Some(expected) => prop_assert_eq!(owners, vec![expected]),
                None => prop_assert!(owners.is_empty()),
            }
        }
    }

    /// Encoding the configuration into `vtype` and parsing it back keeps
    /// every observable field.
    #[test]
    fn prop_vtype_round_trip(
        ma in any::<bool>(),
        ta in any::<bool>(),
        sew in 0u8..4,
        lmul in 0u8..4,
        vill in any::<bool>(),
    ) {
        let config = VectorConfigState {
            ma,
            ta,
            sew,
            lmul,
            lmul_orig: lmul,
            vill,
            ..VectorConfigState::default()
        };
        let back = VectorConfigState::from_vtype(config.vtype());
        prop_assert_eq!(back.ma, ma);
        prop_assert_eq!(back.ta, ta);
        prop_assert_eq!(back.sew, sew);
        prop_assert_eq!(back.lmul_orig, lmul);
        prop_assert_eq!(back.vill, vill);
    }

    /// A full-width write is read back exactly; a byte-enable write leaves
    /// disabled bytes untouched.
    #[test]
    fn prop_vrf_write_read_round_trip(
        base in prop::collection::vec(any::<u8>(), 16),
        update in prop::collection::vec(any::<u8>(), 16),
        enable in prop::collection::vec(any::<bool>(), 16),
    ) {
        let mut vrf = VectorRegFile::new(128);
        prop_assert!(vrf.write(7, &base, &[]));
        prop_assert_eq!(vrf.read(7), base.clone());

        prop_assert!(vrf.write(7, &update, &enable));
        let merged = vrf.read(7);
        for i in 0..16 {
            let expected = if enable[i] { update[i] } else { base[i] };
            prop_assert_eq!(merged[i], expected);
        }
    }
}
