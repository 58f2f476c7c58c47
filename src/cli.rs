//! Terminal driver: walks the intake flow over stdin/stdout.
//!
//! Each step is printed with its options and any saved answer. `back`
//! goes back, `/quit` exits, anything else is parsed as the answer.

use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncWrite, AsyncWriteExt, BufReader};

use crate::error::{FlowError, InputError, Result, SyncError};
use crate::intake::{Destination, IntakeFlow, StepDefinition, StepId, StepInput};
use crate::session::model::{ChoiceOption, Gender, ProfilePatch, Religion, TherapyNeed};

/// Run the flow against the process's stdin and stdout.
pub async fn run(flow: &IntakeFlow) -> Result<()> {
    let reader = BufReader::new(tokio::io::stdin());
    drive(flow, reader, tokio::io::stdout()).await
}

/// Run the flow against any line source and sink.
pub async fn drive<R, W>(flow: &IntakeFlow, reader: R, mut out: W) -> Result<()>
where
    R: AsyncBufRead + Unpin,
    W: AsyncWrite + Unpin,
{
    let mut lines = reader.lines();

    flow.enter_landing().await?;
    let mut destination = flow.start();

    loop {
        let step = match destination {
            Destination::Step(step) => step,
            Destination::Completion => {
                let route = destination.route(flow.routes());
                write(&mut out, &format!("All done. Continue at {route}\n")).await;
                return Ok(());
            }
            Destination::EntryPoint => {
                flow.enter_landing().await?;
                write(&mut out, "Back at the start.\n").await;
                destination = flow.start();
                continue;
            }
        };

        render(flow, step, &mut out).await?;

        let line = match lines.next_line().await {
            Ok(Some(line)) => line,
            Ok(None) => return Ok(()),
            Err(e) => {
                tracing::error!("Error reading stdin: {}", e);
                return Ok(());
            }
        };
        let line = line.trim();

        match line {
            "/quit" => return Ok(()),
            "back" => {
                destination = flow.back(step.as_str()).await?;
            }
            _ => {
                let patch = match parse_answer(step.definition(), line) {
                    Ok(patch) => patch,
                    Err(e) => {
                        write(&mut out, &format!("{e}\n")).await;
                        continue;
                    }
                };
                match flow.submit(step.as_str(), patch).await {
                    Ok(outcome) => destination = outcome.destination,
                    Err(FlowError::Sync(e)) => {
                        let SyncError::Remote { source, .. } = &e;
                        let detail = source.detail();
                        write(&mut out, &format!("Could not save your answer: {detail}. Try again.\n"))
                            .await;
                    }
                    Err(e) => return Err(e.into()),
                }
            }
        }
    }
}

async fn render<W: AsyncWrite + Unpin>(
    flow: &IntakeFlow,
    step: StepId,
    out: &mut W,
) -> Result<()> {
    let view = flow.view(step.as_str()).await?;
    let mut text = format!("\n{}\n", view.title);

    match &view.input {
        StepInput::SingleChoice { options } | StepInput::MultiChoice { options } => {
            for (index, option) in options.iter().enumerate() {
                text.push_str(&format!("  {}. {}\n", index + 1, option.label));
            }
            if matches!(view.input, StepInput::MultiChoice { .. }) {
                text.push_str("  (comma-separated, or \"none\")\n");
            }
        }
        StepInput::YesNo => text.push_str("  yes / no\n"),
        StepInput::Number { placeholder } | StepInput::Text { placeholder } => {
            text.push_str(&format!("  {placeholder}\n"));
        }
    }

    let saved = serde_json::to_value(&view.current).unwrap_or_default();
    if let Some(map) = saved.as_object().filter(|m| !m.is_empty()) {
        for value in map.values() {
            text.push_str(&format!("  saved: {value}\n"));
        }
    }
    if view.back_allowed {
        text.push_str("  (type \"back\" to go back)\n");
    }
    text.push_str("> ");
    write(out, &text).await;
    Ok(())
}

async fn write<W: AsyncWrite + Unpin>(out: &mut W, text: &str) {
    // A closed terminal is not a flow error.
    if let Err(e) = out.write_all(text.as_bytes()).await {
        tracing::debug!("Error writing to terminal: {}", e);
        return;
    }
    if let Err(e) = out.flush().await {
        tracing::debug!("Error flushing terminal: {}", e);
    }
}

/// Parse one line of terminal input into the answer for `definition`.
pub fn parse_answer(definition: &StepDefinition, raw: &str) -> Result<ProfilePatch, InputError> {
    let raw = raw.trim();
    if raw.is_empty() {
        return Err(InputError::Empty);
    }

    let mut patch = ProfilePatch::default();
    match definition.id {
        StepId::Gender => patch.gender = Some(parse_choice::<Gender>(raw)?),
        StepId::Religion => patch.religion = Some(parse_choice::<Religion>(raw)?),
        StepId::ReligiousImportance => {
            patch.is_religious_therapist_preference = Some(parse_yes_no(raw)?)
        }
        StepId::LgbtqPreference => patch.is_lgbtq_therapist_preference = Some(parse_yes_no(raw)?),
        StepId::Age => patch.age = Some(raw.parse().map_err(|_| InputError::NotANumber)?),
        StepId::Location => patch.postal_code = Some(raw.to_string()),
        StepId::TherapyNeeds => patch.therapy_needs = Some(parse_multi::<TherapyNeed>(raw)?),
    }
    Ok(patch)
}

/// Match an option by key, label, or 1-based index.
fn parse_choice<T: ChoiceOption>(raw: &str) -> Result<T, InputError> {
    if let Ok(index) = raw.parse::<usize>() {
        return index
            .checked_sub(1)
            .and_then(|i| T::ALL.get(i).copied())
            .ok_or_else(|| InputError::UnknownOption(raw.to_string()));
    }
    T::from_key(raw)
        .or_else(|| {
            T::ALL
                .iter()
                .copied()
                .find(|o| o.label().eq_ignore_ascii_case(raw))
        })
        .ok_or_else(|| InputError::UnknownOption(raw.to_string()))
}

fn parse_multi<T: ChoiceOption + PartialEq>(raw: &str) -> Result<Vec<T>, InputError> {
    if raw.eq_ignore_ascii_case("none") {
        return Ok(Vec::new());
    }
    let mut selected = Vec::new();
    for part in raw.split(',').map(str::trim).filter(|p| !p.is_empty()) {
        let option = parse_choice::<T>(part)?;
        if !selected.contains(&option) {
            selected.push(option);
        }
    }
    if selected.is_empty() {
        return Err(InputError::Empty);
    }
    Ok(selected)
}

fn parse_yes_no(raw: &str) -> Result<bool, InputError> {
    match raw.to_ascii_lowercase().as_str() {
        "y" | "yes" => Ok(true),
        "n" | "no" => Ok(false),
        _ => Err(InputError::NotYesNo),
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::api::mock::MockSessionApi;
    use crate::api::SessionApi;
    use crate::config::RouteConfig;
    use crate::store::{FlowStore, LibSqlBackend};

    fn def(step: StepId) -> &'static StepDefinition {
        step.definition()
    }

    #[test]
    fn parses_choice_by_key_index_and_label() {
        assert_eq!(
            parse_answer(def(StepId::Gender), "non_binary").unwrap().gender,
            Some(Gender::NonBinary)
        );
        assert_eq!(
            parse_answer(def(StepId::Gender), "2").unwrap().gender,
            Some(Gender::Female)
        );
        assert_eq!(
            parse_answer(def(StepId::Religion), "not applicable").unwrap().religion,
            Some(Religion::NotApplicable)
        );
        assert_eq!(
            parse_answer(def(StepId::Gender), "0"),
            Err(InputError::UnknownOption("0".into()))
        );
        assert_eq!(
            parse_answer(def(StepId::Gender), "robot"),
            Err(InputError::UnknownOption("robot".into()))
        );
    }

    #[test]
    fn parses_yes_no_and_numbers() {
        assert_eq!(
            parse_answer(def(StepId::LgbtqPreference), "Yes")
                .unwrap()
                .is_lgbtq_therapist_preference,
            Some(true)
        );
        assert_eq!(
            parse_answer(def(StepId::ReligiousImportance), "n")
                .unwrap()
                .is_religious_therapist_preference,
            Some(false)
        );
        assert_eq!(
            parse_answer(def(StepId::ReligiousImportance), "maybe"),
            Err(InputError::NotYesNo)
        );
        assert_eq!(parse_answer(def(StepId::Age), "27").unwrap().age, Some(27));
        assert_eq!(parse_answer(def(StepId::Age), "-3"), Err(InputError::NotANumber));
        assert_eq!(parse_answer(def(StepId::Age), "   "), Err(InputError::Empty));
    }

    #[test]
    fn parses_multi_choice() {
        let patch = parse_answer(def(StepId::TherapyNeeds), "anxiety, 9, anxiety").unwrap();
        assert_eq!(
            patch.therapy_needs,
            Some(vec![TherapyNeed::Anxiety, TherapyNeed::Stress])
        );
        let patch = parse_answer(def(StepId::TherapyNeeds), "none").unwrap();
        assert_eq!(patch.therapy_needs, Some(vec![]));
        assert_eq!(
            parse_answer(def(StepId::TherapyNeeds), "anxiety, nope"),
            Err(InputError::UnknownOption("nope".into()))
        );
    }

    #[test]
    fn location_keeps_text() {
        let patch = parse_answer(def(StepId::Location), "  M5A 4L1 ").unwrap();
        assert_eq!(patch.postal_code.as_deref(), Some("M5A 4L1"));
    }

    #[tokio::test]
    async fn drives_full_questionnaire() {
        let api = Arc::new(MockSessionApi::missing());
        let store: Arc<dyn FlowStore> = Arc::new(LibSqlBackend::new_memory().await.unwrap());
        let flow = IntakeFlow::open("cli", Arc::clone(&api) as Arc<dyn SessionApi>, store, RouteConfig::default())
            .await
            .unwrap();

        let input = "female\nbogus\nprefer_not_to_say\nback\n8\nno\n27\nM5A 4L1\nanxiety\n";
        let mut out = Vec::new();
        drive(&flow, input.as_bytes(), &mut out).await.unwrap();

        let text = String::from_utf8(out).unwrap();
        assert!(text.contains("Unknown option: bogus"));
        assert!(text.contains("All done. Continue at /personality-tests/introduction?type=patient"));

        let remote = api.remote().unwrap();
        assert_eq!(remote.gender, Some(Gender::Female));
        assert_eq!(remote.religion, Some(Religion::PreferNotToSay));
        assert_eq!(remote.is_lgbtq_therapist_preference, Some(false));
        assert_eq!(remote.age, Some(27));
        assert_eq!(remote.therapy_needs, Some(vec![TherapyNeed::Anxiety]));
        assert!(remote.is_religious_therapist_preference.is_none());
    }

    #[tokio::test]
    async fn backing_out_to_start_resets_history() {
        let api = Arc::new(MockSessionApi::missing());
        let store: Arc<dyn FlowStore> = Arc::new(LibSqlBackend::new_memory().await.unwrap());
        let flow = IntakeFlow::open("cli", Arc::clone(&api) as Arc<dyn SessionApi>, store, RouteConfig::default())
            .await
            .unwrap();

        let mut out = Vec::new();
        drive(&flow, "male\nback\nback\n/quit\n".as_bytes(), &mut out)
            .await
            .unwrap();

        let text = String::from_utf8(out).unwrap();
        assert!(text.contains("Back at the start."));
        assert!(flow.history().await.is_empty());
        assert_eq!(api.remote().unwrap().gender, Some(Gender::Male));
    }

    #[tokio::test]
    async fn failed_save_can_be_retried() {
        let api = Arc::new(MockSessionApi::missing());
        api.set_fail_patch(true);
        let store: Arc<dyn FlowStore> = Arc::new(LibSqlBackend::new_memory().await.unwrap());
        let flow = IntakeFlow::open("cli", Arc::clone(&api) as Arc<dyn SessionApi>, store, RouteConfig::default())
            .await
            .unwrap();

        let mut out = Vec::new();
        drive(&flow, "male\n/quit\n".as_bytes(), &mut out).await.unwrap();

        let text = String::from_utf8(out).unwrap();
        assert!(text.contains("Could not save your answer: Internal Server Error. Try again."));
        assert!(flow.history().await.is_empty());
    }
}
