//! Logical display content → per-digit segment bytes.

use super::segments::{self, digit, Message, BLANK, MODEL_GLYPHS, SEG_DP};
use super::DisplayMode;
use crate::editor::{EditBuffer, EditTarget};
use crate::time::DateTime;

/// Presentation flags that depend on emulation, model and user settings.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct RenderOptions {
    /// Show hours 1-12 with a blanked leading zero.
    pub twelve_hour: bool,
    /// Light the last decimal point for PM (12-hour only).
    pub pm_dot: bool,
    /// Light the minute-ones decimal point while the alarm is enabled.
    pub alarm_dot: bool,
}

pub fn render_time(hour: u8, minute: u8, second: u8, opts: RenderOptions) -> [u8; 6] {
    let shown = if opts.twelve_hour {
        match hour % 12 {
            0 => 12,
            h => h,
        }
    } else {
        hour
    };
    let tens = if opts.twelve_hour && shown < 10 {
        BLANK
    } else {
        digit(shown / 10)
    };

    let mut out = [
        tens,
        digit(shown % 10),
        digit(minute / 10),
        digit(minute % 10),
        digit(second / 10),
        digit(second % 10),
    ];
    if opts.alarm_dot {
        out[3] |= SEG_DP;
    }
    if opts.twelve_hour && opts.pm_dot && hour >= 12 {
        out[5] |= SEG_DP;
    }
    out
}

/// Month in the hour positions, day in the minute positions.
pub fn render_date(month: u8, day: u8) -> [u8; 6] {
    let month_tens = if month < 10 { BLANK } else { digit(month / 10) };
    [
        month_tens,
        digit(month % 10),
        digit(day / 10),
        digit(day % 10),
        BLANK,
        BLANK,
    ]
}

pub fn render_set(target: EditTarget, buf: &EditBuffer, opts: RenderOptions) -> [u8; 6] {
    let opts = RenderOptions {
        alarm_dot: false,
        ..opts
    };
    match target {
        EditTarget::Time => render_time(buf.hour, buf.minute, buf.second, opts),
        EditTarget::Alarm => {
            let mut out = render_time(buf.hour, buf.minute, 0, opts);
            out[4] = BLANK;
            out[5] &= SEG_DP;
            out
        }
        EditTarget::Date => render_date(buf.month, buf.day),
        EditTarget::Model => {
            let glyph = MODEL_GLYPHS
                .get(buf.model as usize)
                .copied()
                .unwrap_or(BLANK);
            [
                segments::GLYPH_S,
                segments::GLYPH_E,
                segments::GLYPH_T,
                BLANK,
                BLANK,
                glyph,
            ]
        }
    }
}

/// Everything the renderer may need for one frame.
pub struct Frame<'a> {
    pub now: &'a DateTime,
    pub edit: Option<(EditTarget, &'a EditBuffer)>,
    pub opts: RenderOptions,
}

pub fn render(mode: DisplayMode, frame: &Frame<'_>) -> [u8; 6] {
    match mode {
        DisplayMode::Time => render_time(
            frame.now.hour,
            frame.now.minute,
            frame.now.second,
            frame.opts,
        ),
        DisplayMode::Date => render_date(frame.now.month, frame.now.day),
        DisplayMode::Set => match frame.edit {
            Some((target, buf)) => render_set(target, buf, frame.opts),
            None => Message::Blank.segments(),
        },
        DisplayMode::Message(msg) => msg.segments(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::display::segments::{DIGITS, GLYPH_A, GLYPH_D};

    const H24: RenderOptions = RenderOptions {
        twelve_hour: false,
        pm_dot: true,
        alarm_dot: false,
    };

    #[test]
    fn time_24h_keeps_leading_zero() {
        let d = render_time(7, 5, 9, H24);
        assert_eq!(
            d,
            [DIGITS[0], DIGITS[7], DIGITS[0], DIGITS[5], DIGITS[0], DIGITS[9]]
        );
    }

    #[test]
    fn time_12h_blanks_zero_and_marks_pm() {
        let opts = RenderOptions {
            twelve_hour: true,
            ..H24
        };
        let d = render_time(13, 45, 0, opts);
        assert_eq!(d[0], BLANK);
        assert_eq!(d[1], DIGITS[1]);
        assert_eq!(d[5], DIGITS[0] | SEG_DP);

        let midnight = render_time(0, 0, 0, opts);
        assert_eq!(midnight[0], DIGITS[1]);
        assert_eq!(midnight[1], DIGITS[2]);
        assert_eq!(midnight[5] & SEG_DP, 0);
    }

    #[test]
    fn pm_dot_respects_model_trait() {
        let opts = RenderOptions {
            twelve_hour: true,
            pm_dot: false,
            alarm_dot: false,
        };
        assert_eq!(render_time(23, 0, 0, opts)[5] & SEG_DP, 0);
    }

    #[test]
    fn alarm_dot_on_minutes() {
        let opts = RenderOptions {
            alarm_dot: true,
            ..H24
        };
        assert_eq!(render_time(12, 34, 56, opts)[3], DIGITS[4] | SEG_DP);
    }

    #[test]
    fn date_layout() {
        assert_eq!(
            render_date(3, 14),
            [BLANK, DIGITS[3], DIGITS[1], DIGITS[4], BLANK, BLANK]
        );
        assert_eq!(render_date(12, 1)[0], DIGITS[1]);
    }

    #[test]
    fn model_editor_shows_letter() {
        let mut buf = EditBuffer::default();
        assert_eq!(render_set(EditTarget::Model, &buf, H24)[5], GLYPH_A);
        buf.model = 3;
        assert_eq!(render_set(EditTarget::Model, &buf, H24)[5], GLYPH_D);
    }

    #[test]
    fn alarm_editor_blanks_seconds() {
        let buf = EditBuffer {
            hour: 6,
            minute: 30,
            ..EditBuffer::default()
        };
        let d = render_set(EditTarget::Alarm, &buf, H24);
        assert_eq!(&d[..4], &[DIGITS[0], DIGITS[6], DIGITS[3], DIGITS[0]]);
        assert_eq!(d[4], BLANK);
        assert_eq!(d[5], BLANK);
    }

    #[test]
    fn message_frame() {
        let now = DateTime::default();
        let frame = Frame {
            now: &now,
            edit: None,
            opts: H24,
        };
        assert_eq!(
            render(DisplayMode::Message(Message::Wait), &frame),
            [segments::DASH; 6]
        );
        assert_eq!(render(DisplayMode::Set, &frame), [BLANK; 6]);
    }
}
