//! Interactive terminal questionnaire.
//!
//! Drives a [`Navigator`] from line-based input. At any prompt, `back` moves one step back,
//! `restart` starts over and `quit` (or end of input) leaves.

use std::collections::BTreeMap;
use std::error::Error;
use std::io::{self, BufRead, Write};
use std::path::Path;

use triage_core::{Navigator, RiskSelection, Step, TriageError};
use triage_types::{Answer, Gender};

const FREE_TEXT_CHOICE: &str = "0";

pub struct Interview<'a, R, W> {
    input: R,
    out: W,
    report_dir: Option<&'a Path>,
    quit: bool,
}

impl<'a, R: BufRead, W: Write> Interview<'a, R, W> {
    pub fn new(input: R, out: W, report_dir: Option<&'a Path>) -> Self {
        Self {
            input,
            out,
            report_dir,
            quit: false,
        }
    }

    /// Runs until the user quits or input ends.
    pub fn run(&mut self, nav: &mut Navigator) -> Result<(), Box<dyn Error>> {
        writeln!(
            self.out,
            "Type 'back' to go back, 'restart' to start over or 'quit' to leave."
        )?;
        while !self.quit {
            self.step(nav)?;
        }
        Ok(())
    }

    fn step(&mut self, nav: &mut Navigator) -> Result<(), Box<dyn Error>> {
        let view = nav.view();
        writeln!(self.out)?;
        writeln!(self.out, "{}", view.prompt)?;

        match nav.step() {
            Step::Welcome => {
                if self.prompt(nav, "Press Enter to begin.")?.is_some() {
                    nav.begin()?;
                }
            }
            Step::UserInfo => self.user_info(nav)?,
            Step::SymptomCategory => {
                self.list(&view.options)?;
                writeln!(self.out, "  {FREE_TEXT_CHOICE}) Describe my symptoms in my own words")?;
                let Some(reply) = self.prompt(nav, "Choice:")? else {
                    return Ok(());
                };
                let result = if reply == FREE_TEXT_CHOICE {
                    nav.request_free_input()
                } else {
                    nav.select_category(&pick(&view.options, &reply))
                };
                self.show(result)?;
            }
            Step::SymptomFreeInput => {
                let Some(text) = self.prompt(nav, "Symptoms:")? else {
                    return Ok(());
                };
                match nav.submit_free_text(&text) {
                    Err(TriageError::NoMatch(_)) => {
                        writeln!(self.out, "  ! I couldn't match those symptoms.")?;
                        let Some(reply) =
                            self.prompt(nav, "Try again (r) or speak with a doctor (d)?")?
                        else {
                            return Ok(());
                        };
                        if reply.eq_ignore_ascii_case("d") {
                            nav.escalate()?;
                        }
                    }
                    other => self.show(other)?,
                }
            }
            Step::SymptomCategoryFreeInput => {
                self.list(&view.options)?;
                writeln!(self.out, "  r) Search again")?;
                writeln!(self.out, "  d) Speak with a doctor")?;
                let Some(reply) = self.prompt(nav, "Choice:")? else {
                    return Ok(());
                };
                let result = match reply.to_ascii_lowercase().as_str() {
                    "r" => nav.retry_search(),
                    "d" => nav.escalate(),
                    _ => nav.select_category(&pick(&view.options, &reply)),
                };
                self.show(result)?;
            }
            Step::SymptomSubcategory => {
                self.list(&view.options)?;
                let Some(reply) = self.prompt(nav, "Choice:")? else {
                    return Ok(());
                };
                let result = nav.select_subcategory(&pick(&view.options, &reply));
                self.show(result)?;
            }
            Step::SymptomSelection => {
                self.list(&view.options)?;
                let Some(reply) = self.prompt(nav, "Choices (comma separated):")? else {
                    return Ok(());
                };
                let result = nav.select_symptoms(&pick_many(&view.options, &reply));
                self.show(result)?;
            }
            Step::ClarifyingQuestions(_) => self.clarifying(nav, &view.options)?,
            Step::RiskFlagSelection => {
                self.list(&view.options)?;
                let Some(reply) = self.prompt(nav, "Choices (comma separated):")? else {
                    return Ok(());
                };
                let selection = RiskSelection {
                    flags: pick_many(&view.options, &reply),
                    none: false,
                };
                match nav.select_risks(&selection) {
                    Ok((_, Some(warning))) => writeln!(self.out, "  ! {warning}")?,
                    Ok(_) => {}
                    Err(e) => self.show::<()>(Err(e))?,
                }
            }
            Step::Results => self.results(nav)?,
            Step::Fallback => {
                let Some(reply) = self.prompt(nav, "Search again (r) or quit (q)?")? else {
                    return Ok(());
                };
                if reply.eq_ignore_ascii_case("r") {
                    nav.retry_search()?;
                } else {
                    writeln!(self.out, "Please contact your doctor or call your local health line.")?;
                    self.quit = true;
                }
            }
        }
        Ok(())
    }

    fn user_info(&mut self, nav: &mut Navigator) -> Result<(), Box<dyn Error>> {
        let Some(age) = self.prompt(nav, "Age:")? else {
            return Ok(());
        };
        let Ok(age) = age.parse::<u8>() else {
            writeln!(self.out, "  ! Please enter your age as a number.")?;
            return Ok(());
        };
        let Some(gender) = self.prompt(nav, "Gender (male/female):")? else {
            return Ok(());
        };
        let gender = if gender.is_empty() {
            None
        } else {
            match gender.parse::<Gender>() {
                Ok(g) => Some(g),
                Err(e) => {
                    writeln!(self.out, "  ! {e}")?;
                    return Ok(());
                }
            }
        };
        let Some(existing) = self.prompt(nav, "Existing conditions (optional):")? else {
            return Ok(());
        };
        let result = nav.submit_user_info(age, gender, &existing);
        self.show(result)
    }

    fn clarifying(
        &mut self,
        nav: &mut Navigator,
        questions: &[String],
    ) -> Result<(), Box<dyn Error>> {
        let mut answers = BTreeMap::new();
        for question in questions {
            let Some(reply) = self.prompt(nav, &format!("{question} (y/n)"))? else {
                return Ok(());
            };
            match reply.parse::<Answer>() {
                Ok(answer) => {
                    answers.insert(question.clone(), answer);
                }
                Err(e) => {
                    writeln!(self.out, "  ! {e}")?;
                    return Ok(());
                }
            }
        }
        let result = nav.answer_clarifying(&answers);
        self.show(result)
    }

    fn results(&mut self, nav: &mut Navigator) -> Result<(), Box<dyn Error>> {
        if let Some(outcome) = nav.outcome() {
            writeln!(self.out, "  {}", outcome.headline)?;
            writeln!(self.out, "  {}", outcome.rationale.label())?;
            writeln!(self.out, "  Recommendation: {}", outcome.recommendation)?;
            if let Some(referral) = &outcome.referral {
                writeln!(self.out, "  Referral: {referral}")?;
            }
            if outcome.is_high_risk {
                writeln!(self.out, "  This needs prompt attention.")?;
            }
        }

        if let (Some(dir), Some(report)) =
            (self.report_dir, nav.report(chrono::Local::now().date_naive()))
        {
            match report.write_to(dir) {
                Ok(path) => writeln!(self.out, "  Report saved to {}", path.display())?,
                Err(e) => writeln!(self.out, "  ! {e}")?,
            }
        }

        let Some(reply) = self.prompt(nav, "Start a new check? (y/n)")? else {
            return Ok(());
        };
        if reply.eq_ignore_ascii_case("y") {
            nav.start_over();
        } else {
            self.quit = true;
        }
        Ok(())
    }

    /// Reads one reply. `None` means the step should not continue: the user navigated or quit.
    fn prompt(&mut self, nav: &mut Navigator, question: &str) -> io::Result<Option<String>> {
        write!(self.out, "{question} ")?;
        self.out.flush()?;

        let mut line = String::new();
        if self.input.read_line(&mut line)? == 0 {
            self.quit = true;
            return Ok(None);
        }
        let reply = line.trim();
        match reply.to_ascii_lowercase().as_str() {
            "back" => {
                nav.back();
                Ok(None)
            }
            "restart" => {
                nav.start_over();
                Ok(None)
            }
            "quit" | "exit" => {
                self.quit = true;
                Ok(None)
            }
            _ => Ok(Some(reply.to_string())),
        }
    }

    fn list(&mut self, options: &[String]) -> io::Result<()> {
        for (i, option) in options.iter().enumerate() {
            writeln!(self.out, "  {}) {}", i + 1, option)?;
        }
        Ok(())
    }

    /// Prints recoverable errors inline; anything else ends the run.
    fn show<T>(&mut self, result: Result<T, TriageError>) -> Result<(), Box<dyn Error>> {
        match result {
            Ok(_) => Ok(()),
            Err(e) if e.is_recoverable() => {
                writeln!(self.out, "  ! {e}")?;
                Ok(())
            }
            Err(e) => Err(e.into()),
        }
    }
}

/// Resolves a 1-based option number to its text; anything else is passed through.
fn pick(options: &[String], reply: &str) -> String {
    match reply.trim().parse::<usize>() {
        Ok(n) if (1..=options.len()).contains(&n) => options[n - 1].clone(),
        _ => reply.trim().to_string(),
    }
}

fn pick_many(options: &[String], reply: &str) -> Vec<String> {
    reply
        .split(',')
        .map(str::trim)
        .filter(|r| !r.is_empty())
        .map(|r| pick(options, r))
        .collect()
}
