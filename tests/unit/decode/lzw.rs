use super::*;
use crate::test_support::literal_lzw;

#[test]
fn literal_stream_expands_verbatim() {
    let indices = [0u8, 1, 2, 3, 3, 2, 1, 0];
    let data = literal_lzw(2, &indices);
    assert_eq!(decompress(2, &data, indices.len()).unwrap(), indices);
}

#[test]
fn early_end_code_zero_fills() {
    // clear(4), 1, end(5) at 3 bits each.
    let data = [0x4C, 0x01];
    assert_eq!(decompress(2, &data, 4).unwrap(), vec![1, 0, 0, 0]);
}

#[test]
fn empty_payload_zero_fills() {
    assert_eq!(decompress(2, &[], 3).unwrap(), vec![0, 0, 0]);
}

#[test]
fn code_equal_to_next_slot_repeats_previous_string() {
    // clear(4), 1, 6, end(5): code 6 is not yet defined and expands to "1 1".
    let data = [0x8C, 0x0B];
    assert_eq!(decompress(2, &data, 3).unwrap(), vec![1, 1, 1]);
}

#[test]
fn width_grows_when_slot_count_hits_power_of_two() {
    // clear, 1, 1, 1 at 3 bits; slot 8 is reached so 6 and end are read at 4 bits.
    let data = [0x4C, 0x62, 0x05];
    assert_eq!(decompress(2, &data, 6).unwrap(), vec![1, 1, 1, 1, 1, 0]);
}

#[test]
fn code_past_next_slot_is_corrupt() {
    // clear(4), 1, 7 while the next free slot is 6.
    let data = [0xCC, 0x01];
    let err = decompress(2, &data, 8).unwrap_err();
    assert!(matches!(err, AnimError::CorruptData(_)));
}

#[test]
fn table_reference_before_first_literal_is_corrupt() {
    // clear(4), 6.
    let data = [0x34];
    let err = decompress(2, &data, 2).unwrap_err();
    assert!(matches!(err, AnimError::CorruptData(_)));
}

#[test]
fn min_code_size_out_of_range_is_corrupt() {
    assert!(matches!(
        decompress(0, &[0], 1),
        Err(AnimError::CorruptData(_))
    ));
    assert!(matches!(
        decompress(12, &[0], 1),
        Err(AnimError::CorruptData(_))
    ));
}

#[test]
fn surplus_codes_are_ignored_once_all_pixels_exist() {
    let data = literal_lzw(2, &[3, 2, 1, 0]);
    assert_eq!(decompress(2, &data, 2).unwrap(), vec![3, 2]);
}

#[test]
fn prefix_stops_at_limit_without_zero_fill() {
    let data = literal_lzw(2, &[3, 2, 1, 0]);
    assert_eq!(decompress_prefix(2, &data, 2).unwrap(), vec![3, 2]);
    assert_eq!(decompress_prefix(2, &data, usize::MAX).unwrap(), vec![3, 2, 1, 0]);
    assert!(decompress_prefix(2, &[], usize::MAX).unwrap().is_empty());
}
