use std::sync::mpsc;
use std::time::Duration;

use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};
use tecla::challenge::{
    Challenge, Cue, Effect, Phase, COUNTDOWN_STEP_MS, FREEZE_MS, PRE_DRAW_DELAY_MS,
};
use tecla::clock::{Clock, ManualClock};
use tecla::media::CueOutcome;
use tecla::roulette::ScriptedDraws;

fn drive_past_countdown(challenge: &mut Challenge, clock: &ManualClock) {
    challenge.start(clock.now_ms());
    for _ in 0..3 {
        clock.advance(COUNTDOWN_STEP_MS);
        challenge.tick(clock.now_ms());
    }
    assert_eq!(challenge.phase(), Phase::Active);
}

fn force_error_streak(challenge: &mut Challenge, clock: &ManualClock, strikes: u32) {
    for _ in 0..strikes {
        clock.advance(500);
        challenge.on_input(clock.now_ms(), "@");
        clock.advance(FREEZE_MS);
        challenge.tick(clock.now_ms());
    }
}

// The long way round: three strikes, a survived draw, then a clean finish.
// The summary must carry the whole story.
#[test]
fn survived_draw_then_victory_keeps_all_totals() {
    let mut challenge =
        Challenge::with_draw_source("hola mundo", 5, Box::new(ScriptedDraws::new([3])));
    let clock = ManualClock::new(0);

    drive_past_countdown(&mut challenge, &clock);
    force_error_streak(&mut challenge, &clock, 3);

    // Timer paused at the third thaw; the draw fires after the extra delay
    let frozen = challenge.elapsed_ms(clock.now_ms());
    clock.advance(PRE_DRAW_DELAY_MS);
    let effects = challenge.tick(clock.now_ms());
    assert_eq!(effects, vec![Effect::CueRequested(Cue::Survival)]);

    // A long outcome cue must not leak into the elapsed time
    clock.advance(10_000);
    challenge.cue_resolved(clock.now_ms(), CueOutcome::Completed);
    assert_eq!(challenge.phase(), Phase::Active);
    assert_eq!(challenge.elapsed_ms(clock.now_ms()), frozen);

    clock.advance(2_000);
    let effects = challenge.on_input(clock.now_ms(), "hola mundo");
    match effects.as_slice() {
        [Effect::Victory(summary)] => {
            assert_eq!(summary.total_errors, 3);
            assert_eq!(summary.total_draws, 1);
            assert_eq!(summary.final_odds, 4);
            assert_eq!(summary.elapsed_ms, frozen + 2_000);
        }
        other => panic!("expected a victory effect, got {other:?}"),
    }
}

#[test]
fn second_streak_draws_again_with_narrowed_odds() {
    let mut challenge =
        Challenge::with_draw_source("hola mundo", 5, Box::new(ScriptedDraws::new([5, 1])));
    let clock = ManualClock::new(0);

    drive_past_countdown(&mut challenge, &clock);

    // First streak: survives, odds narrow 5 -> 4
    force_error_streak(&mut challenge, &clock, 3);
    clock.advance(PRE_DRAW_DELAY_MS);
    challenge.tick(clock.now_ms());
    challenge.cue_resolved(clock.now_ms(), CueOutcome::Completed);
    assert_eq!(challenge.odds(), 4);
    assert_eq!(challenge.consecutive_errors(), 0);
    assert_eq!(challenge.total_draws(), 1);

    // Second streak: the scripted 1 is fatal
    force_error_streak(&mut challenge, &clock, 3);
    clock.advance(PRE_DRAW_DELAY_MS);
    let effects = challenge.tick(clock.now_ms());
    assert_eq!(effects, vec![Effect::CueRequested(Cue::Elimination)]);

    let effects = challenge.cue_resolved(clock.now_ms(), CueOutcome::Failed);
    match effects.as_slice() {
        [Effect::CueFallback(Cue::Elimination), Effect::Eliminated(summary)] => {
            assert_eq!(summary.total_draws, 2);
            assert_eq!(summary.total_errors, 6);
            assert_eq!(summary.final_odds, 4);
        }
        other => panic!("expected fallback + elimination, got {other:?}"),
    }
    assert_eq!(challenge.phase(), Phase::Eliminated);
}

#[test]
fn exactly_one_draw_per_three_error_streak() {
    let mut challenge =
        Challenge::with_draw_source("hola mundo", 5, Box::new(ScriptedDraws::new([4, 3])));
    let clock = ManualClock::new(0);

    drive_past_countdown(&mut challenge, &clock);
    force_error_streak(&mut challenge, &clock, 3);
    clock.advance(PRE_DRAW_DELAY_MS);
    challenge.tick(clock.now_ms());
    assert_eq!(challenge.total_draws(), 1);

    // Extra ticks while the cue is up must not draw again
    for _ in 0..20 {
        clock.advance(100);
        challenge.tick(clock.now_ms());
    }
    assert_eq!(challenge.total_draws(), 1);

    challenge.cue_resolved(clock.now_ms(), CueOutcome::Completed);
    assert_eq!(challenge.total_draws(), 1);
}

// Headless integration using the internal runtime + Challenge without a TTY,
// the same way the real event loop feeds the machine.
#[test]
fn runner_driven_match_completes() {
    let mut challenge = Challenge::new("hi", 5);
    let clock = ManualClock::new(0);
    let mut typed = String::new();

    let (tx, rx) = mpsc::channel();
    let es = tecla::runtime::TestEventSource::new(rx);
    let ticker = tecla::runtime::FixedTicker::new(Duration::from_millis(1));
    let runner = tecla::runtime::Runner::new(es, ticker);

    // Producer: the keystrokes for the reference text
    for c in ['h', 'i'] {
        tx.send(tecla::runtime::GameEvent::Key(KeyEvent::new(
            KeyCode::Char(c),
            KeyModifiers::NONE,
        )))
        .unwrap();
    }

    challenge.start(clock.now_ms());

    // Drive a tiny event loop until the match is over (or bounded steps).
    // Keystrokes are buffered until the countdown has run out.
    let mut pending: Vec<char> = Vec::new();
    for _ in 0..200u32 {
        match runner.step() {
            tecla::runtime::GameEvent::Tick => {
                clock.advance(200);
                challenge.tick(clock.now_ms());
            }
            tecla::runtime::GameEvent::Key(key) => {
                if let KeyCode::Char(c) = key.code {
                    pending.push(c);
                }
            }
            _ => {}
        }
        if challenge.phase() == Phase::Active {
            for c in pending.drain(..) {
                typed.push(c);
                challenge.on_input(clock.now_ms(), &typed);
            }
        }
        if challenge.is_over() {
            break;
        }
    }

    assert_eq!(challenge.phase(), Phase::Victorious);
    assert_eq!(challenge.progress_pct(), 100);
}

#[test]
fn paste_never_feeds_the_error_machine() {
    let mut challenge = Challenge::new("hola mundo", 5);
    let clock = ManualClock::new(0);
    drive_past_countdown(&mut challenge, &clock);

    for _ in 0..5 {
        assert_eq!(challenge.on_paste(), vec![Effect::PasteRejected]);
    }
    assert_eq!(challenge.total_errors(), 0);
    assert_eq!(challenge.total_draws(), 0);
    assert_eq!(challenge.phase(), Phase::Active);
}
