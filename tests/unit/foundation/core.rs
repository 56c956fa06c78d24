use super::*;

#[test]
fn rect_covers_only_exact_full_canvas() {
    let canvas = Canvas {
        width: 4,
        height: 3,
    };
    assert!(canvas.full_rect().covers(canvas));

    let inset = FrameRect {
        left: 1,
        top: 0,
        width: 3,
        height: 3,
    };
    assert!(!inset.covers(canvas));
}

#[test]
fn rect_clip_trims_overhang() {
    let canvas = Canvas {
        width: 10,
        height: 10,
    };
    let r = FrameRect {
        left: 8,
        top: 9,
        width: 5,
        height: 5,
    };
    assert_eq!(
        r.clip_to(canvas),
        FrameRect {
            left: 8,
            top: 9,
            width: 2,
            height: 1
        }
    );

    let outside = FrameRect {
        left: 20,
        top: 0,
        width: 5,
        height: 5,
    };
    assert_eq!(outside.clip_to(canvas).area(), 0);
}

#[test]
fn rect_contains_boundaries() {
    let r = FrameRect {
        left: 2,
        top: 2,
        width: 2,
        height: 2,
    };
    assert!(!r.contains(1, 2));
    assert!(r.contains(2, 2));
    assert!(r.contains(3, 3));
    assert!(!r.contains(4, 3));
}

#[test]
fn duration_helpers() {
    let ms = Duration::from_millis;
    assert_eq!(duration_rem(ms(750), ms(600)), ms(150));
    assert_eq!(duration_rem(ms(600), ms(600)), Duration::ZERO);
    assert_eq!(duration_mul_div(ms(600), 2, 3), ms(400));
    assert_eq!(duration_scale(ms(200), 1.5).unwrap(), ms(300));
    assert!(duration_scale(ms(200), f64::NAN).is_err());
}
