use corral::{ComponentMask, MAX_TYPES};

const BIT_COUNT: u64 = MAX_TYPES as u64;

#[test]
fn set_and_reset() {
    let mut mask = ComponentMask::new();
    assert_eq!(mask.count_ones(), 0);
    assert_eq!(mask.count_zeros(), BIT_COUNT);
    assert_eq!(mask.count_leading_zeros(), BIT_COUNT);
    assert_eq!(mask.count_leading_ones(), 0);
    assert_eq!(mask.count_trailing_zeros(), BIT_COUNT);
    assert_eq!(mask.count_trailing_ones(), 0);

    for i in 0..BIT_COUNT {
        mask.reset_all();
        mask.set(i);
        assert!(mask.test(i));
        assert_eq!(mask.count_ones(), 1);
        assert_eq!(mask.count_zeros(), BIT_COUNT - 1);
        assert_eq!(mask.count_trailing_zeros(), i);
        assert_eq!(mask.count_trailing_ones(), if i == 0 { 1 } else { 0 });
        assert_eq!(mask.count_leading_zeros(), BIT_COUNT - i - 1);
        assert_eq!(
            mask.count_leading_ones(),
            if i == BIT_COUNT - 1 { 1 } else { 0 }
        );
        // Setting twice is idempotent.
        mask.set(i);
        assert!(mask.test(i));
        assert_eq!(mask.count_ones(), 1);
    }

    for i in 0..BIT_COUNT {
        mask.set_all();
        mask.reset(i);
        assert!(!mask.test(i));
        assert_eq!(mask.count_ones(), BIT_COUNT - 1);
        assert_eq!(mask.count_zeros(), 1);
        assert_eq!(mask.count_trailing_zeros(), if i == 0 { 1 } else { 0 });
        assert_eq!(mask.count_trailing_ones(), i);
        assert_eq!(
            mask.count_leading_zeros(),
            if i == BIT_COUNT - 1 { 1 } else { 0 }
        );
        assert_eq!(mask.count_leading_ones(), BIT_COUNT - i - 1);
        mask.reset(i);
        assert!(!mask.test(i));
        assert_eq!(mask.count_zeros(), 1);
    }
}

#[test]
fn column_ordinal_counts_bits_below() {
    let mut mask = ComponentMask::new();
    mask.set(700);
    mask.set(501);
    mask.set(500);
    mask.set(499);
    mask.set(456);
    mask.set(311);
    mask.set(154);
    mask.set(4);
    assert_eq!(mask.count_ones_left_of(500), 5);
}

#[test]
fn comparisons() {
    let mut mask1 = ComponentMask::new();
    let mut mask2 = ComponentMask::new();
    assert_eq!(mask1, mask2);
    mask1.set_all();
    assert_ne!(mask1, mask2);
    mask1.reset_all();

    for i in (0..BIT_COUNT).step_by(2) {
        mask1.set(i);
        mask2.set(i);
        assert_eq!(mask1, mask2);
    }

    for i in (1..BIT_COUNT).step_by(2) {
        mask2.set(i);
        assert_ne!(mask1, mask2);
        assert!(!mask1.test_all(&mask2));
        assert!(mask2.test_all(&mask1));
        mask2.reset(i);
        assert_eq!(mask1, mask2);
    }
}

#[test]
fn intersection() {
    let mut mask1 = ComponentMask::new();
    let mut mask2 = ComponentMask::new();
    let mut mask3 = ComponentMask::new();
    mask1.set(100);
    mask2.set(100);
    mask2.set(900);
    mask3.set(800);
    assert_eq!((mask1 & mask2).count_ones(), 1);
    assert_eq!(mask1 & mask2, mask1);
    assert_eq!((mask3 & mask2).count_ones(), 0);
    assert_eq!((mask2 & mask2).count_ones(), 2);
    assert_eq!(mask2 & mask2, mask2);
    assert!(mask2.test_any(&mask1));
    assert!(!mask3.test_any(&mask2));
}

#[test]
fn typed_bits() {
    #[derive(Clone, Copy)]
    struct First(#[allow(dead_code)] i32);
    #[derive(Clone, Copy)]
    struct Second(#[allow(dead_code)] u8);

    let mut mask1 = ComponentMask::new();
    let mut mask2 = ComponentMask::new();
    mask1.set_type::<First>();
    mask2.set_type::<Second>();
    assert_eq!(mask1.count_ones(), 1);
    assert_eq!(mask2.count_ones(), 1);
    assert_ne!(mask1, mask2);
    mask1.set_type::<Second>();
    mask2.set_type::<First>();
    assert_eq!(mask1.count_ones(), 2);
    assert_eq!(mask2.count_ones(), 2);
    assert_eq!(mask1, mask2);
    assert!(mask1.test_type::<First>());
    mask1.reset_type::<First>();
    assert!(!mask1.test_type::<First>());
}

#[test]
fn hashing() {
    let mut mask1 = ComponentMask::new();
    let mut mask2 = ComponentMask::new();
    mask1.set(100);
    mask2.set(800);
    // Not a quality guarantee, but equal masks must agree and these two
    // particular masks must not collide.
    assert_eq!(mask1.hash(), mask1.hash());
    assert_eq!(mask2.hash(), mask2.hash());
    assert_ne!(mask1.hash(), mask2.hash());
}

#[test]
fn type_id_enumeration_is_ascending() {
    let mut mask = ComponentMask::new();
    for &bit in &[900, 3, 64, 511] {
        mask.set(bit);
    }
    let ids: Vec<u64> = mask.type_ids().collect();
    assert_eq!(ids, vec![3, 64, 511, 900]);
}

#[test]
#[should_panic(expected = "bit position out of range")]
fn out_of_range_bit_is_fatal() {
    let mut mask = ComponentMask::new();
    mask.set(BIT_COUNT);
}
