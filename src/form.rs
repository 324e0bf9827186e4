use crate::validate::FieldErrors;

#[derive(Clone, Copy, Debug, PartialEq)]
pub enum FieldKind {
    Text,
    Secret,
    Choice(&'static [&'static str]),
}

#[derive(Clone, Debug)]
pub struct Field {
    pub key: &'static str,
    pub label: &'static str,
    pub kind: FieldKind,
    pub value: String,
    pub disabled: bool,
    pub hidden: bool,
}

impl Field {
    pub fn text(key: &'static str, label: &'static str) -> Field {
        Field {
            key,
            label,
            kind: FieldKind::Text,
            value: String::new(),
            disabled: false,
            hidden: false,
        }
    }

    pub fn secret(key: &'static str, label: &'static str) -> Field {
        Field {
            kind: FieldKind::Secret,
            ..Field::text(key, label)
        }
    }

    pub fn choice(key: &'static str, label: &'static str, options: &'static [&'static str]) -> Field {
        Field {
            kind: FieldKind::Choice(options),
            value: options.first().copied().unwrap_or_default().to_string(),
            ..Field::text(key, label)
        }
    }

    fn editable(&self) -> bool {
        !self.disabled && !self.hidden
    }

    /// What the screen shows; secrets are masked.
    pub fn display(&self) -> String {
        match self.kind {
            FieldKind::Secret => "*".repeat(self.value.chars().count()),
            _ => self.value.clone(),
        }
    }
}

/// Labelled inputs with one focused field and per-field error messages.
#[derive(Clone, Debug)]
pub struct Form {
    pub fields: Vec<Field>,
    pub focus: usize,
    pub errors: FieldErrors,
}

impl Form {
    pub fn new(fields: Vec<Field>) -> Form {
        let mut form = Form {
            fields,
            focus: 0,
            errors: FieldErrors::new(),
        };
        if !form.fields.is_empty() && !form.fields[0].editable() {
            form.focus_next();
        }
        form
    }

    pub fn value(&self, key: &str) -> &str {
        self.fields
            .iter()
            .find(|field| field.key == key)
            .map(|field| field.value.as_str())
            .unwrap_or_default()
    }

    pub fn set(&mut self, key: &str, value: impl Into<String>) {
        if let Some(field) = self.field_mut(key) {
            field.value = value.into();
        }
    }

    pub fn set_disabled(&mut self, key: &str, disabled: bool) {
        if let Some(field) = self.field_mut(key) {
            field.disabled = disabled;
        }
        if !self.focused_editable() {
            self.focus_next();
        }
    }

    pub fn set_hidden(&mut self, key: &str, hidden: bool) {
        if let Some(field) = self.field_mut(key) {
            field.hidden = hidden;
        }
        if !self.focused_editable() {
            self.focus_next();
        }
    }

    pub fn is_disabled(&self, key: &str) -> bool {
        self.fields
            .iter()
            .any(|field| field.key == key && field.disabled)
    }

    pub fn error(&self, key: &str) -> Option<&str> {
        self.errors.get(key).map(String::as_str)
    }

    pub fn focused(&self) -> Option<&Field> {
        self.fields.get(self.focus)
    }

    pub fn focus_key(&mut self, key: &str) {
        if let Some(idx) = self.fields.iter().position(|field| field.key == key) {
            if self.fields[idx].editable() {
                self.focus = idx;
            }
        }
    }

    pub fn focus_next(&mut self) {
        self.step_focus(1);
    }

    pub fn focus_previous(&mut self) {
        self.step_focus(self.fields.len().saturating_sub(1));
    }

    pub fn push_char(&mut self, c: char) {
        let kind = match self.focused_field_mut() {
            Some(field) => field.kind,
            None => return,
        };
        match kind {
            FieldKind::Choice(_) if c == ' ' => self.cycle_choice(true),
            FieldKind::Choice(_) => {}
            FieldKind::Text | FieldKind::Secret => {
                if let Some(field) = self.focused_field_mut() {
                    field.value.push(c);
                }
            }
        }
    }

    pub fn pop_char(&mut self) {
        if let Some(field) = self.focused_field_mut() {
            if !matches!(field.kind, FieldKind::Choice(_)) {
                field.value.pop();
            }
        }
    }

    /// Moves a focused choice field to the next (or previous) option.
    pub fn cycle_choice(&mut self, forward: bool) {
        if let Some(field) = self.focused_field_mut() {
            if let FieldKind::Choice(options) = field.kind {
                if options.is_empty() {
                    return;
                }
                let current = options
                    .iter()
                    .position(|option| *option == field.value)
                    .unwrap_or(0);
                let next = if forward {
                    (current + 1) % options.len()
                } else {
                    (current + options.len() - 1) % options.len()
                };
                field.value = options[next].to_string();
            }
        }
    }

    fn step_focus(&mut self, step: usize) {
        let len = self.fields.len();
        if len == 0 {
            return;
        }
        let mut idx = self.focus;
        for _ in 0..len {
            idx = (idx + step) % len;
            if self.fields[idx].editable() {
                self.focus = idx;
                return;
            }
        }
    }

    fn focused_editable(&self) -> bool {
        self.focused().is_some_and(Field::editable)
    }

    fn focused_field_mut(&mut self) -> Option<&mut Field> {
        self.fields.get_mut(self.focus).filter(|field| field.editable())
    }

    fn field_mut(&mut self, key: &str) -> Option<&mut Field> {
        self.fields.iter_mut().find(|field| field.key == key)
    }
}
