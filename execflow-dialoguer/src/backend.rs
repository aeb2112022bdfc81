//! Dialoguer front end for the flow simulator.

use std::collections::{HashMap, HashSet};

use dialoguer::{Confirm, Editor, Input, MultiSelect, Select, theme::ColorfulTheme};
use execflow::{
    CaptureOutcome, ChoiceOption, ChoiceQuestion, Flow, FlowSimulator, ImageFile,
    ImageUploadQuestion, InventoryItem, InventoryKind, InventoryStatus, PreviewStore, Question,
    QuestionKind, ServiceError, SimulationPayload, StockControlQuestion, TextQuestion,
};
use thiserror::Error;

/// Error type for the Dialoguer simulator.
#[derive(Debug, Error)]
pub enum DialoguerError {
    /// User cancelled the simulation (e.g., pressed Ctrl+C or Escape).
    #[error("Simulation cancelled by user")]
    Cancelled,

    /// An I/O error occurred during prompting.
    #[error("Dialoguer error: {0}")]
    Dialoguer(#[from] dialoguer::Error),
}

/// Helper to check if a dialoguer error is a cancellation (Ctrl+C / Escape)
fn is_cancelled(err: &dialoguer::Error) -> bool {
    matches!(err, dialoguer::Error::IO(io_err) if io_err.kind() == std::io::ErrorKind::Interrupted)
}

fn prompt_error(err: dialoguer::Error) -> DialoguerError {
    if is_cancelled(&err) {
        DialoguerError::Cancelled
    } else {
        DialoguerError::Dialoguer(err)
    }
}

/// What to do after a step's questions were asked.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Action {
    Next,
    Previous,
    Submit,
    Revise,
    Abort,
}

impl Action {
    fn label(self) -> &'static str {
        match self {
            Self::Next => "Next step",
            Self::Previous => "Previous step",
            Self::Submit => "Submit",
            Self::Revise => "Answer again",
            Self::Abort => "Abort simulation",
        }
    }
}

/// Interactive simulator for the terminal.
///
/// Walks a flow one step at a time, asking every question of the current
/// step and then offering navigation with the same gating as the engine.
#[derive(Debug, Clone)]
pub struct DialoguerSimulator {
    /// Use colorful theme for prompts.
    colorful: bool,

    /// Prefix for money amounts.
    currency: String,

    /// Items offered to stock-control questions, per inventory.
    catalogs: HashMap<InventoryKind, Vec<InventoryItem>>,
}

impl Default for DialoguerSimulator {
    fn default() -> Self {
        Self::new()
    }
}

impl DialoguerSimulator {
    /// Create a simulator with the colorful theme.
    pub fn new() -> Self {
        Self {
            colorful: true,
            currency: "$".to_string(),
            catalogs: HashMap::new(),
        }
    }

    /// Create a simulator with plain (no color) theme.
    pub fn plain() -> Self {
        Self {
            colorful: false,
            ..Self::new()
        }
    }

    /// Set the symbol printed before totals.
    pub fn with_currency(mut self, symbol: impl Into<String>) -> Self {
        self.currency = symbol.into();
        self
    }

    /// Provide the items of one inventory. Kinds without a catalog fail to load.
    pub fn with_inventory(mut self, kind: InventoryKind, items: Vec<InventoryItem>) -> Self {
        self.catalogs.insert(kind, items);
        self
    }

    /// Run a simulation to completion.
    ///
    /// Returns the submitted payload, or `None` if the user aborted.
    pub fn run(&self, flow: Flow) -> Result<Option<SimulationPayload>, DialoguerError> {
        let mut simulator = FlowSimulator::new(flow, ConsolePreviews::default());
        println!("Simulating \"{}\"", simulator.flow().title);

        loop {
            self.load_inventory(&mut simulator);

            let Some(step) = simulator.current_step().cloned() else {
                println!("This flow has no steps.");
                return Ok(None);
            };

            println!();
            println!(
                "Step {}/{}: {}",
                simulator.current_index() + 1,
                simulator.step_count(),
                step.title
            );
            for line in [&step.subtitle, &step.description].into_iter().flatten() {
                println!("  {line}");
            }

            for question in &step.questions {
                self.ask_question(&mut simulator, question)?;
            }

            let unanswered: Vec<String> = simulator
                .unanswered_questions()
                .into_iter()
                .map(|q| q.title.clone())
                .collect();
            if !unanswered.is_empty() {
                println!("Still unanswered: {}", unanswered.join(", "));
            }

            match self.choose_action(&simulator)? {
                Action::Next => {
                    simulator.next();
                }
                Action::Previous => {
                    simulator.previous();
                }
                Action::Submit => {
                    let mut submitted = None;
                    simulator.submit(|payload| submitted = Some(payload));
                    simulator.close();
                    return Ok(submitted);
                }
                Action::Revise => {}
                Action::Abort => {
                    if self.confirm("Discard all answers?")? {
                        simulator.close();
                        return Ok(None);
                    }
                }
            }
        }
    }

    fn choose_action<P: PreviewStore>(
        &self,
        simulator: &FlowSimulator<P>,
    ) -> Result<Action, DialoguerError> {
        let mut actions = Vec::new();
        if simulator.can_submit() {
            actions.push(Action::Submit);
        }
        if simulator.can_advance() {
            actions.push(Action::Next);
        }
        if simulator.current_index() > 0 {
            actions.push(Action::Previous);
        }
        actions.push(Action::Revise);
        actions.push(Action::Abort);

        let labels: Vec<&str> = actions.iter().map(|a| a.label()).collect();
        let index = self.select("What next?", &labels, 0)?;
        Ok(actions[index])
    }

    fn load_inventory<P: PreviewStore>(&self, simulator: &mut FlowSimulator<P>) {
        for request in simulator.take_inventory_requests() {
            let result = self.catalogs.get(&request.kind).cloned().ok_or_else(|| {
                ServiceError::failed(
                    format!("no {} catalog configured", request.kind),
                    anyhow::anyhow!("missing {} inventory", request.kind),
                )
            });
            simulator.finish_inventory_load(&request.question_id, result);
        }
    }

    /// Ask a single question and record the answer.
    fn ask_question<P: PreviewStore>(
        &self,
        simulator: &mut FlowSimulator<P>,
        question: &Question,
    ) -> Result<(), DialoguerError> {
        println!();
        if let Some(subtitle) = &question.subtitle {
            println!("{subtitle}");
        }
        if !question.description.is_empty() {
            println!("{}", question.description);
        }

        match &question.kind {
            QuestionKind::Text(text_q) => self.ask_text(simulator, question, text_q),
            QuestionKind::Textarea(text_q) => self.ask_multiline(simulator, question, text_q),
            QuestionKind::SingleSelect(choice) => self.ask_single(simulator, question, choice),
            QuestionKind::MultiSelect(choice) => self.ask_multi(simulator, question, choice),
            QuestionKind::ImageUpload(upload) => self.ask_images(simulator, question, upload),
            QuestionKind::StockControl(stock) => self.ask_stock(simulator, question, stock),
        }
    }

    fn ask_text<P: PreviewStore>(
        &self,
        simulator: &mut FlowSimulator<P>,
        question: &Question,
        text_q: &TextQuestion,
    ) -> Result<(), DialoguerError> {
        let prompt = with_limit(&question.title, text_q.limit());
        loop {
            let current = simulator
                .answer(&question.id)
                .and_then(|a| a.as_text())
                .unwrap_or_default()
                .to_string();
            let value = self.input(&prompt, &current)?;
            if report(simulator.set_text(&question.id, &value)) {
                return Ok(());
            }
        }
    }

    fn ask_multiline<P: PreviewStore>(
        &self,
        simulator: &mut FlowSimulator<P>,
        question: &Question,
        text_q: &TextQuestion,
    ) -> Result<(), DialoguerError> {
        loop {
            println!("{}", with_limit(&question.title, text_q.limit()));
            let current = simulator
                .answer(&question.id)
                .and_then(|a| a.as_text())
                .unwrap_or_default()
                .to_string();

            let value = Editor::new()
                .edit(&current)
                .map_err(prompt_error)?
                .unwrap_or_default();
            if report(simulator.set_text(&question.id, value.trim_end())) {
                return Ok(());
            }
        }
    }

    fn ask_single<P: PreviewStore>(
        &self,
        simulator: &mut FlowSimulator<P>,
        question: &Question,
        choice: &ChoiceQuestion,
    ) -> Result<(), DialoguerError> {
        if choice.options.is_empty() {
            println!("\"{}\" has no options.", question.title);
            return Ok(());
        }
        let labels: Vec<&str> = choice.options.iter().map(|o| o.title.as_str()).collect();
        let current = simulator
            .answer(&question.id)
            .and_then(|a| a.as_choice())
            .and_then(|value| choice.options.iter().position(|o| o.value == value))
            .unwrap_or(0);

        let index = self.select(&question.title, &labels, current)?;
        let option = &choice.options[index];
        report(simulator.select_option(&question.id, &option.value));
        if option.enable_extra_answer {
            self.ask_extra(simulator, question, option)?;
        }
        Ok(())
    }

    fn ask_multi<P: PreviewStore>(
        &self,
        simulator: &mut FlowSimulator<P>,
        question: &Question,
        choice: &ChoiceQuestion,
    ) -> Result<(), DialoguerError> {
        if choice.options.is_empty() {
            println!("\"{}\" has no options.", question.title);
            return Ok(());
        }
        let selected: Vec<String> = simulator
            .answer(&question.id)
            .and_then(|a| a.as_choices())
            .map(<[String]>::to_vec)
            .unwrap_or_default();
        let labels: Vec<&str> = choice.options.iter().map(|o| o.title.as_str()).collect();
        let defaults: Vec<bool> = choice
            .options
            .iter()
            .map(|o| selected.contains(&o.value))
            .collect();

        let picks = {
            let _theme;
            let mut builder: MultiSelect;
            if self.colorful {
                _theme = ColorfulTheme::default();
                builder = MultiSelect::with_theme(&_theme);
            } else {
                builder = MultiSelect::new();
            }
            builder = builder
                .with_prompt(&question.title)
                .items(&labels)
                .defaults(&defaults);
            builder.interact().map_err(prompt_error)?
        };

        for (index, option) in choice.options.iter().enumerate() {
            if picks.contains(&index) != defaults[index] {
                report(simulator.toggle_option(&question.id, &option.value));
            }
        }
        for &index in &picks {
            let option = &choice.options[index];
            if option.enable_extra_answer {
                self.ask_extra(simulator, question, option)?;
            }
        }
        Ok(())
    }

    fn ask_extra<P: PreviewStore>(
        &self,
        simulator: &mut FlowSimulator<P>,
        question: &Question,
        option: &ChoiceOption,
    ) -> Result<(), DialoguerError> {
        let prompt = with_limit(
            &format!("{} - details (optional)", option.title),
            option.extra_answer_limit(),
        );
        loop {
            let current = simulator.extra_answers().get(&option.id).to_string();
            let value = self.input(&prompt, &current)?;
            if report(simulator.set_extra_answer(&question.id, &option.id, &value)) {
                return Ok(());
            }
        }
    }

    fn ask_images<P: PreviewStore>(
        &self,
        simulator: &mut FlowSimulator<P>,
        question: &Question,
        upload: &ImageUploadQuestion,
    ) -> Result<(), DialoguerError> {
        let mut prompt = format!(
            "{} (file paths separated by commas, accepts {})",
            question.title,
            upload.accept_filter()
        );
        if let Some(max) = upload.limit() {
            prompt.push_str(&format!(", up to {max}"));
        }

        let existing = simulator
            .answer(&question.id)
            .and_then(|a| a.as_images())
            .map_or(0, <[String]>::len);
        if existing > 0 && !self.confirm(&format!("Replace the {existing} attached image(s)?"))? {
            return Ok(());
        }

        let raw = self.input(&prompt, "")?;
        let files: Vec<ImageFile> = raw
            .split(',')
            .map(str::trim)
            .filter(|path| !path.is_empty())
            .map(|path| ImageFile::new(path, content_type(path)))
            .collect();

        let kept = upload.cap(files.len());
        if kept < files.len() {
            println!("Only the first {kept} image(s) were kept.");
        }
        report(simulator.attach_images(&question.id, &files));
        Ok(())
    }

    fn ask_stock<P: PreviewStore>(
        &self,
        simulator: &mut FlowSimulator<P>,
        question: &Question,
        stock: &StockControlQuestion,
    ) -> Result<(), DialoguerError> {
        println!("{}", question.title);
        let items = match simulator.inventory_status(&question.id) {
            Some(InventoryStatus::Ready(items)) if items.is_empty() => {
                println!("No {} items available.", stock.inventory);
                return Ok(());
            }
            Some(InventoryStatus::Ready(items)) => items.clone(),
            Some(InventoryStatus::Failed(message)) => {
                println!("Could not load {} inventory: {message}", stock.inventory);
                return Ok(());
            }
            Some(InventoryStatus::Loading | InventoryStatus::NotRequested) | None => {
                println!("Loading {} inventory...", stock.inventory);
                return Ok(());
            }
        };

        loop {
            let selection = simulator
                .stock_selection(&question.id)
                .cloned()
                .unwrap_or_default();
            let mut labels: Vec<String> = items
                .iter()
                .map(|item| {
                    let marker = match selection.quantity(&item.id) {
                        Some(quantity) => format!("[x] {quantity} x"),
                        None => "[ ]".to_string(),
                    };
                    match item.unit_price {
                        Some(price) => {
                            format!("{marker} {} ({}{price:.2})", item.name, self.currency)
                        }
                        None => format!("{marker} {}", item.name),
                    }
                })
                .collect();
            labels.push("Done".to_string());
            if let Some(total) = simulator.stock_total(&question.id) {
                println!("Total: {}{total:.2}", self.currency);
            }

            let index = self.select("Pick an item to change", &labels, labels.len() - 1)?;
            let Some(item) = items.get(index) else {
                return Ok(());
            };

            if !selection.contains(&item.id) {
                report(simulator.toggle_stock_item(&question.id, &item.id));
            }
            let current = i64::from(selection.quantity(&item.id).unwrap_or(0));
            let quantity = {
                let _theme;
                let mut builder: Input<i64>;
                if self.colorful {
                    _theme = ColorfulTheme::default();
                    builder = Input::with_theme(&_theme);
                } else {
                    builder = Input::new();
                }
                builder = builder
                    .with_prompt(format!("Quantity of {} (0 removes it)", item.name))
                    .default(current);
                builder.interact_text().map_err(prompt_error)?
            };
            report(simulator.set_stock_quantity(&question.id, &item.id, quantity));
        }
    }

    // === Prompt helpers ===

    fn input(&self, prompt: &str, current: &str) -> Result<String, DialoguerError> {
        let _theme;
        let mut builder: Input<String>;
        if self.colorful {
            _theme = ColorfulTheme::default();
            builder = Input::with_theme(&_theme);
        } else {
            builder = Input::new();
        }
        builder = builder.with_prompt(prompt).allow_empty(true);
        if !current.is_empty() {
            builder = builder.with_initial_text(current);
        }
        builder.interact_text().map_err(prompt_error)
    }

    fn select<T: ToString>(
        &self,
        prompt: &str,
        items: &[T],
        default: usize,
    ) -> Result<usize, DialoguerError> {
        let _theme;
        let mut builder: Select;
        if self.colorful {
            _theme = ColorfulTheme::default();
            builder = Select::with_theme(&_theme);
        } else {
            builder = Select::new();
        }
        builder = builder.with_prompt(prompt).items(items).default(default);
        builder.interact().map_err(prompt_error)
    }

    fn confirm(&self, prompt: &str) -> Result<bool, DialoguerError> {
        let _theme;
        let mut builder: Confirm;
        if self.colorful {
            _theme = ColorfulTheme::default();
            builder = Confirm::with_theme(&_theme);
        } else {
            builder = Confirm::new();
        }
        builder = builder.with_prompt(prompt).default(false);
        builder.interact().map_err(prompt_error)
    }
}

/// Print a rejection and report whether the capture went through.
fn report(outcome: CaptureOutcome) -> bool {
    match outcome {
        CaptureOutcome::Recorded => true,
        CaptureOutcome::Rejected(reason) => {
            println!("Error: {reason}");
            false
        }
    }
}

fn with_limit(prompt: &str, max_length: Option<usize>) -> String {
    match max_length {
        Some(max) => format!("{prompt} (max {max} characters)"),
        None => prompt.to_string(),
    }
}

/// Guess a MIME type from the file extension.
fn content_type(path: &str) -> &'static str {
    let extension = path
        .rsplit_once('.')
        .map(|(_, ext)| ext.to_ascii_lowercase())
        .unwrap_or_default();
    match extension.as_str() {
        "jpg" | "jpeg" => "image/jpeg",
        "png" => "image/png",
        "gif" => "image/gif",
        "webp" => "image/webp",
        "heic" => "image/heic",
        _ => "application/octet-stream",
    }
}

/// Preview references for files named on the command line.
///
/// Nothing is rendered in a terminal, so a reference is just a tagged path.
#[derive(Debug, Default)]
struct ConsolePreviews {
    live: HashSet<String>,
    issued: usize,
}

impl PreviewStore for ConsolePreviews {
    fn acquire(&mut self, file: &ImageFile) -> String {
        self.issued += 1;
        let reference = format!("preview:{}:{}", self.issued, file.name);
        self.live.insert(reference.clone());
        tracing::debug!(%reference, content_type = %file.content_type, "preview acquired");
        reference
    }

    fn release(&mut self, reference: &str) {
        if !self.live.remove(reference) {
            tracing::warn!(reference, "released an unknown preview");
        }
    }
}

impl Drop for ConsolePreviews {
    fn drop(&mut self) {
        if !self.live.is_empty() {
            tracing::warn!(leaked = self.live.len(), "previews outlived the simulation");
        }
    }
}
