use super::*;
use crate::cache::store::CacheOpts;
use crate::playback::controller::PlaybackState;
use crate::test_support::{GifBytes, TestFrame};

const PALETTE: [[u8; 3]; 2] = [[0, 0, 0], [255, 255, 255]];

fn gif(frames: usize, loops: Option<u16>) -> GifSource {
    let mut b = GifBytes::new(1, 1, Some(&PALETTE));
    if let Some(n) = loops {
        b = b.netscape_loop(n);
    }
    for i in 0..frames {
        b = b.control(10, 0, None).image(TestFrame {
            left: 0,
            top: 0,
            width: 1,
            height: 1,
            indices: &[(i % 2) as u8],
            local_palette: None,
            interlaced: false,
        });
    }
    GifSource::bytes(b.trailer())
}

fn cache() -> Arc<DecodeCache> {
    Arc::new(DecodeCache::new(CacheOpts::default()).unwrap())
}

fn ms(v: u64) -> Duration {
    Duration::from_millis(v)
}

#[test]
fn default_options_auto_start() {
    let opts = AttachOptions::default();
    assert!(opts.auto_start);
    assert_eq!(AttachOptions::from_json("{}").unwrap(), opts);
}

#[test]
fn options_parse_from_json() {
    let opts = AttachOptions::from_json(
        r#"{"auto_start": false, "repeat": {"count": 2}, "speed_ratio": 1.5}"#,
    )
    .unwrap();
    assert!(!opts.auto_start);
    assert_eq!(opts.repeat, Some(RepeatBehavior::Count(2)));
    assert_eq!(opts.speed_ratio, Some(1.5));

    let opts = AttachOptions::from_json(r#"{"repeat": "forever"}"#).unwrap();
    assert_eq!(opts.repeat, Some(RepeatBehavior::Forever));

    assert!(matches!(
        AttachOptions::from_json(r#"{"speed": 2}"#),
        Err(AnimError::Validation(_))
    ));
}

#[test]
fn conflicting_options_fail_before_decoding() {
    let cache = cache();
    let err = cache
        .attach(
            &gif(2, None),
            AttachOptions {
                speed_ratio: Some(2.0),
                fixed_duration_ms: Some(500),
                ..AttachOptions::default()
            },
        )
        .unwrap_err();
    assert!(matches!(err, AnimError::ConfigurationConflict(_)));
    assert_eq!(cache.decode_count(), 0);

    for bad in [
        AttachOptions {
            speed_ratio: Some(0.0),
            ..AttachOptions::default()
        },
        AttachOptions {
            fixed_duration_ms: Some(0),
            ..AttachOptions::default()
        },
    ] {
        assert!(matches!(
            bad.validate(),
            Err(AnimError::ConfigurationConflict(_))
        ));
    }
    assert!(matches!(
        AttachOptions {
            repeat: Some(RepeatBehavior::Count(0)),
            ..AttachOptions::default()
        }
        .validate(),
        Err(AnimError::Validation(_))
    ));
}

#[test]
fn attach_plays_and_repeat_comes_from_the_stream() {
    let cache = cache();
    let handle = cache.attach(&gif(3, Some(0)), AttachOptions::default()).unwrap();
    assert_eq!(handle.controller().state(), PlaybackState::Playing);
    assert_eq!(handle.controller().repeat(), RepeatBehavior::Forever);
    assert_eq!(cache.ref_count(handle.key()), 1);

    let once = cache.attach(&gif(3, None), AttachOptions::default()).unwrap();
    assert_eq!(once.controller().repeat(), RepeatBehavior::Count(1));
}

#[test]
fn explicit_repeat_overrides_the_stream() {
    let cache = cache();
    let handle = cache
        .attach(
            &gif(2, Some(0)),
            AttachOptions {
                repeat: Some(RepeatBehavior::Count(2)),
                fixed_duration_ms: Some(100),
                ..AttachOptions::default()
            },
        )
        .unwrap();
    assert_eq!(handle.controller().repeat(), RepeatBehavior::Count(2));
    assert_eq!(handle.controller().fixed_duration(), Some(ms(100)));
}

#[test]
fn static_sources_do_not_start() {
    let cache = cache();
    let handle = cache.attach(&gif(1, None), AttachOptions::default()).unwrap();
    assert!(!handle.timeline().is_animated());
    assert_eq!(handle.controller().state(), PlaybackState::Initial);
    assert!(handle.try_current_image().unwrap().is_ok());
}

#[test]
fn tick_moves_the_current_image() {
    let cache = cache();
    let mut handle = cache.attach(&gif(3, Some(0)), AttachOptions::default()).unwrap();
    assert_eq!(handle.current_frame(), 0);
    assert!(handle.try_current_image().is_some());

    assert_eq!(handle.tick(ms(100)).unwrap(), Some(1));
    let frame = handle.current_image().unwrap();
    assert_eq!(frame.index, 1);
    assert_eq!(frame.start, ms(100));
    assert_eq!(*frame.image.get_pixel(0, 0), image::Rgba([255, 255, 255, 255]));
}

#[test]
fn handles_share_a_timeline_but_not_playback() {
    let cache = cache();
    let src = gif(3, Some(0));
    let mut a = cache.attach(&src, AttachOptions::default()).unwrap();
    let b = cache
        .attach(
            &src,
            AttachOptions {
                auto_start: false,
                ..AttachOptions::default()
            },
        )
        .unwrap();
    assert!(Arc::ptr_eq(a.timeline(), b.timeline()));
    assert_eq!(cache.decode_count(), 1);
    assert_eq!(cache.ref_count(a.key()), 2);

    a.tick(ms(150)).unwrap();
    assert_eq!(a.current_frame(), 1);
    assert_eq!(b.current_frame(), 0);
    assert!(b.controller().is_paused());
}

#[test]
fn detach_and_drop_release_references() {
    let cache = cache();
    let src = gif(2, None);
    let a = cache.attach(&src, AttachOptions::default()).unwrap();
    let b = cache.attach(&src, AttachOptions::default()).unwrap();
    let key = a.key().clone();

    assert_eq!(cache.detach(a).unwrap(), 1);
    drop(b);
    assert!(!cache.contains(&key));
    assert!(cache.is_empty());
}

#[test]
fn detach_through_another_cache_is_rejected() {
    let cache_a = cache();
    let cache_b = cache();
    let handle = cache_a.attach(&gif(2, None), AttachOptions::default()).unwrap();
    let key = handle.key().clone();

    assert!(matches!(
        cache_b.detach(handle),
        Err(AnimError::Validation(_))
    ));
    assert!(!cache_a.contains(&key));
}
