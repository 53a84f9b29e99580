use std::io;
use std::io::Write;

use crossterm::cursor;
use crossterm::queue;
use crossterm::style;
use crossterm::terminal;
use crossterm::tty::IsTty;

const BAR_LENGTH: usize = 50;

/// A single-line textual progress indicator, `Progress: [---->     ] 40%`.
///
/// Each update rewrites the current line. The line is terminated once the last frame is reported.
/// On a terminal the line is cleared with escape sequences, anywhere else a carriage return
/// has to do.
pub struct ProgressBar {
    out: Box<dyn Write>,
    total: usize,

    /// Whether `out` understands terminal escape sequences
    terminal: bool,
}

impl ProgressBar {
    /// A progress bar writing plain text to `out`
    pub fn new(total: usize, out: Box<dyn Write>) -> Self {
        Self {
            out,
            total,
            terminal: false,
        }
    }

    pub fn stdout(total: usize) -> Self {
        let stdout = io::stdout();
        let terminal = stdout.is_tty();

        Self {
            out: Box::new(stdout),
            total,
            terminal,
        }
    }

    /// Reports `current` of `total` frames as done.
    pub fn update(&mut self, current: usize) -> io::Result<()> {
        let line = line(current, self.total);

        if self.terminal {
            queue!(
                self.out,
                cursor::MoveToColumn(0),
                terminal::Clear(terminal::ClearType::CurrentLine),
                style::Print(line)
            )?;
        } else {
            write!(self.out, "\r{line}")?;
        }

        if current >= self.total {
            writeln!(self.out)?;
        }

        self.out.flush()
    }
}

/// Renders the progress line for `current` of `total`.
pub fn line(current: usize, total: usize) -> String {
    let fraction = if total == 0 {
        1.0
    } else {
        current.min(total) as f64 / total as f64
    };

    // truncates toward zero, so the first few percent show only the head
    let dashes = (fraction * BAR_LENGTH as f64 - 1.0).max(0.0) as usize;
    let arrow = format!("{}>", "-".repeat(dashes));
    let padding = " ".repeat(BAR_LENGTH.saturating_sub(arrow.len()));
    let percent = (fraction * 100.0) as usize;

    format!("Progress: [{arrow}{padding}] {percent}%")
}

#[cfg(test)]
mod test {
    use std::cell::RefCell;
    use std::io;
    use std::io::Write;
    use std::rc::Rc;

    use super::ProgressBar;
    use super::line;

    #[test]
    fn lines() {
        insta::assert_snapshot!(line(0, 4), @"Progress: [>                                                 ] 0%");
        insta::assert_snapshot!(line(1, 2), @"Progress: [------------------------>                         ] 50%");
        insta::assert_snapshot!(line(2, 2), @"Progress: [------------------------------------------------->] 100%");
        insta::assert_snapshot!(line(1, 3), @"Progress: [--------------->                                  ] 33%");
    }

    #[test]
    fn line_is_fixed_width() {
        for total in 1..40 {
            for current in 0..=total {
                let l = line(current, total);
                let bar = &l[l.find('[').unwrap()..=l.find(']').unwrap()];

                assert_eq!(bar.len(), 52, "{l}");
            }
        }
    }

    #[derive(Clone, Default)]
    struct Shared(Rc<RefCell<Vec<u8>>>);

    impl Write for Shared {
        fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
            self.0.borrow_mut().write(buf)
        }

        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    #[test]
    fn newline_only_at_the_end() {
        let out = Shared::default();
        let mut bar = ProgressBar::new(2, Box::new(out.clone()));

        bar.update(1).unwrap();
        assert!(!out.0.borrow().contains(&b'\n'));

        bar.update(2).unwrap();
        let text = String::from_utf8(out.0.borrow().clone()).unwrap();
        assert!(text.ends_with("100%\n"));
        assert!(text.contains("50%"));
    }

    #[test]
    fn plain_output_has_no_escapes() {
        let out = Shared::default();
        let mut bar = ProgressBar::new(2, Box::new(out.clone()));

        bar.update(1).unwrap();
        bar.update(2).unwrap();

        let text = String::from_utf8(out.0.borrow().clone()).unwrap();
        assert!(!text.contains('\x1b'));
        assert_eq!(text.matches('\r').count(), 2);
        assert!(text.starts_with("\rProgress: ["));
    }

    #[cfg(unix)]
    #[test]
    fn terminal_output_clears_the_line() {
        let out = Shared::default();
        let mut bar = ProgressBar {
            out: Box::new(out.clone()),
            total: 1,
            terminal: true,
        };

        bar.update(1).unwrap();

        let text = String::from_utf8(out.0.borrow().clone()).unwrap();
        assert!(text.starts_with('\x1b'));
        assert!(!text.contains('\r'));
        assert!(text.ends_with("100%\n"));
    }
}
