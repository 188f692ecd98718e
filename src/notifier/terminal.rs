use std::io::{self, Write};

use crate::notifier::Notifier;
use crate::strategy::SignalReport;

/// Prints the observation list and verdict line to stdout.
pub struct TerminalNotifier;

impl TerminalNotifier {
    fn render(&self, out: &mut impl Write, instrument: &str, report: &SignalReport) -> io::Result<()> {
        writeln!(
            out,
            "== {instrument} [{}] score {}/{} ==",
            report.profile, report.score, report.max_score
        )?;
        for line in report.lines() {
            writeln!(out, "  {line}")?;
        }
        Ok(())
    }
}

impl Notifier for TerminalNotifier {
    fn notify(&self, instrument: &str, report: &SignalReport) {
        tracing::info!(
            instrument,
            profile = %report.profile,
            score = report.score,
            max_score = report.max_score,
            verdict = %report.verdict,
            "SIGNAL: {}",
            report.verdict_line,
        );

        let stdout = io::stdout();
        if let Err(e) = self.render(&mut stdout.lock(), instrument, report) {
            tracing::warn!(error = %e, instrument, "failed to print signal report");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::profile::ProfileKind;
    use crate::strategy::Verdict;

    fn report() -> SignalReport {
        SignalReport {
            profile: ProfileKind::Standard,
            observations: vec![
                "RSI 28.00 < 30: oversold, buying opportunity".into(),
                "MACD < signal: bearish momentum".into(),
            ],
            score: 2,
            max_score: 6,
            verdict: Verdict::SellOrHold,
            verdict_line: "Overall: sell or stay out".into(),
        }
    }

    #[test]
    fn render_lists_observations_then_verdict() {
        let mut out = Vec::new();
        TerminalNotifier.render(&mut out, "KRW-BTC", &report()).unwrap();
        let text = String::from_utf8(out).unwrap();
        assert_eq!(
            text,
            "== KRW-BTC [standard] score 2/6 ==\n\
             \x20 RSI 28.00 < 30: oversold, buying opportunity\n\
             \x20 MACD < signal: bearish momentum\n\
             \x20 Overall: sell or stay out\n"
        );
    }

    #[test]
    fn terminal_notifier_does_not_panic() {
        TerminalNotifier.notify("KRW-BTC", &report());
    }
}
