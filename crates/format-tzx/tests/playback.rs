//! Tape images played end to end: bytes in, EAR levels out.

use format_tzx::{PlayPhase, TapePlayer, TzxBlock, TzxError, TzxFile};

fn tzx(blocks: &[&[u8]]) -> Vec<u8> {
    let mut bytes = b"ZXTape!\x1A\x01\x14".to_vec();
    for block in blocks {
        bytes.extend_from_slice(block);
    }
    bytes
}

/// Pure tone, a looped two-pulse sequence, then a stop.
fn looped_image() -> Vec<u8> {
    tzx(&[
        // $12: 2 pulses of 1000 T-states
        &[0x12, 0xE8, 0x03, 0x02, 0x00],
        // $24: repeat twice
        &[0x24, 0x02, 0x00],
        // $13: pulses of 500 and 500
        &[0x13, 0x02, 0xF4, 0x01, 0xF4, 0x01],
        &[0x25],
        // $20: pause 0 stops the tape
        &[0x20, 0x00, 0x00],
    ])
}

#[test]
fn looped_image_plays_expected_waveform() {
    let mut player = TapePlayer::from_tzx(&looped_image()).expect("parse");
    player.init_play(0);

    let samples = [
        (500, true),
        (1_500, false),
        (2_200, true),
        (2_700, false),
        (3_200, true),
        (3_700, false),
    ];
    for (tact, level) in samples {
        assert_eq!(player.get_ear_bit(tact), level, "tact {tact}");
    }
    assert!(player.is_playing());

    assert!(player.get_ear_bit(4_100));
    assert!(player.is_finished());
    assert_eq!(player.phase(), PlayPhase::Completed);
}

#[test]
fn boundary_tact_belongs_to_next_pulse() {
    let mut player = TapePlayer::from_tzx(&looped_image()).expect("parse");
    player.init_play(10);
    assert!(player.get_ear_bit(1_009));
    assert!(!player.get_ear_bit(1_010));
}

#[test]
fn parsed_blocks_keep_file_order() {
    let file = TzxFile::parse(&looped_image()).expect("parse");
    assert_eq!((file.major, file.minor), (1, 20));
    let ids: Vec<u8> = file.blocks.iter().map(TzxBlock::id).collect();
    assert_eq!(ids, [0x12, 0x24, 0x13, 0x25, 0x20]);
}

#[test]
fn truncated_image_is_rejected_whole() {
    let mut image = looped_image();
    image.truncate(image.len() - 1);
    assert!(matches!(
        TzxFile::parse(&image),
        Err(TzxError::Truncated { .. })
    ));
    assert!(TapePlayer::from_tzx(&image).is_err());
}

#[test]
fn tap_image_plays_header_pilot() {
    // Header record: flag $00, one payload byte, checksum.
    let image = [0x03, 0x00, 0x00, 0x5A, 0x5A];
    let mut player = TapePlayer::from_tap(&image).expect("parse");
    player.init_play(0);
    assert_eq!(player.phase(), PlayPhase::Pilot);
    assert_eq!(player.current_block().map(|b| b.pilot_count()), Some(8063));
    assert!(player.get_ear_bit(100));
    assert!(!player.get_ear_bit(2_168));
}

#[test]
fn set_signal_level_block_inverts_following_tone() {
    let image = tzx(&[
        // $2B: length 1, level low
        &[0x2B, 0x01, 0x00, 0x00, 0x00, 0x00],
        // $12: 2 pulses of 1000 T-states
        &[0x12, 0xE8, 0x03, 0x02, 0x00],
    ]);
    let mut player = TapePlayer::from_tzx(&image).expect("parse");
    player.init_play(0);
    assert!(!player.get_ear_bit(500));
    assert!(player.get_ear_bit(1_500));
    assert!(player.get_ear_bit(2_100));
    assert!(player.is_finished());
}
