use execflow::{
    Flow, FlowEditor, OptionPatch, QuestionPatch, QuestionType, SequentialIds, StepPatch,
};

use crate::persisted;

/// A two-step equipment check, authored through the editor.
pub fn quick_inspection() -> Flow {
    let mut editor = FlowEditor::new(SequentialIds::new("insp"));
    editor.set_title("Quick inspection");

    let first = editor
        .draft()
        .steps
        .first()
        .map(|step| step.id.clone())
        .unwrap_or_default();
    editor.update_step(&first, StepPatch::new().title("Equipment"));
    if let Some(q) = editor.add_question(&first) {
        editor.update_question(
            &first,
            &q,
            QuestionPatch::new()
                .title("Dryer condition")
                .question_type(QuestionType::SingleSelect),
        );
        let mut last = None;
        for (title, value) in [("Working", "ok"), ("Needs repair", "repair")] {
            if let Some(option) = editor.add_option(&first, &q) {
                editor.update_option(&first, &q, &option, OptionPatch::new().title(title).value(value));
                last = Some(option);
            }
        }
        if let Some(option) = last {
            editor.update_option(
                &first,
                &q,
                &option,
                OptionPatch::new()
                    .enable_extra_answer(true)
                    .extra_answer_max_length(Some(40)),
            );
        }
    }

    let second = editor.add_step();
    editor.update_step(&second, StepPatch::new().title("Sign-off"));
    if let Some(q) = editor.add_question(&second) {
        editor.update_question(
            &second,
            &q,
            QuestionPatch::new().title("Inspector initials").max_length(Some(4)),
        );
    }

    persisted("flow-quick-inspection", editor.into_draft())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn quick_inspection_is_valid() {
        let flow = quick_inspection();
        assert!(flow.is_valid());
        assert_eq!(flow.steps.len(), 2);
        assert_eq!(flow.steps[1].step_number, 2);
        let options = flow.steps[0].questions[0].options();
        assert_eq!(options.len(), 2);
        assert!(options[1].enable_extra_answer);
    }
}
