use serde::{Deserialize, Serialize};

/// Field name the genre checkboxes submit under.
pub const GENRES_FIELD: &str = "genres";

#[derive(Clone, Copy, Debug, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ControlKind {
    Text,
    Search,
    Number,
    Hidden,
    Checkbox,
    Select,
}

/// One control of the filter form.
#[derive(Clone, Debug, PartialEq, Deserialize, Serialize)]
pub struct FormControl {
    pub id: String,
    pub name: String,
    pub kind: ControlKind,
    pub value: String,
    #[serde(default)]
    pub checked: bool,
    /// Id of the enclosing element, when the control sits inside one (e.g. a slider container).
    #[serde(default)]
    pub container: Option<String>,
}

impl FormControl {
    pub fn new(
        id: impl Into<String>,
        name: impl Into<String>,
        kind: ControlKind,
        value: impl Into<String>,
    ) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            kind,
            value: value.into(),
            checked: false,
            container: None,
        }
    }

    pub fn text(id: &str, name: &str) -> Self {
        Self::new(id, name, ControlKind::Text, "")
    }

    pub fn hidden(id: &str, name: &str) -> Self {
        Self::new(id, name, ControlKind::Hidden, "")
    }

    pub fn checkbox(id: &str, name: &str, value: &str) -> Self {
        Self::new(id, name, ControlKind::Checkbox, value)
    }

    pub fn inside(mut self, container: &str) -> Self {
        self.container = Some(container.to_string());
        self
    }

    pub fn is_checkbox(&self) -> bool {
        self.kind == ControlKind::Checkbox
    }
}

/// The filter form: controls in document order.
#[derive(Clone, Debug, Default, PartialEq, Deserialize, Serialize)]
pub struct FilterForm {
    pub id: String,
    pub controls: Vec<FormControl>,
}

impl FilterForm {
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            controls: Vec::new(),
        }
    }

    pub fn push(&mut self, control: FormControl) {
        self.controls.push(control);
    }

    pub fn control(&self, id: &str) -> Option<&FormControl> {
        self.controls.iter().find(|c| c.id == id)
    }

    pub fn control_mut(&mut self, id: &str) -> Option<&mut FormControl> {
        self.controls.iter_mut().find(|c| c.id == id)
    }

    /// The checkbox submitting `value` under `name`, matched on the exact value.
    pub fn checkbox_for(&self, name: &str, value: &str) -> Option<&FormControl> {
        self.controls
            .iter()
            .find(|c| c.is_checkbox() && c.name == name && c.value == value)
    }

    pub fn value_of(&self, id: &str) -> Option<&str> {
        self.control(id).map(|c| c.value.as_str())
    }

    /// Default serialization: every non-checkbox control with a non-empty value.
    pub fn entries(&self) -> Vec<(String, String)> {
        self.controls
            .iter()
            .filter(|c| !c.is_checkbox() && !c.name.is_empty() && !c.value.is_empty())
            .map(|c| (c.name.clone(), c.value.clone()))
            .collect()
    }

    /// Values of the checked checkboxes named `name`, in document order.
    pub fn checked_values(&self, name: &str) -> Vec<String> {
        self.controls
            .iter()
            .filter(|c| c.is_checkbox() && c.checked && c.name == name)
            .map(|c| c.value.clone())
            .collect()
    }

    /// Query pairs: the default entries followed by one `genres` pair per checked genre.
    pub fn query_pairs(&self) -> Vec<(String, String)> {
        let mut pairs = self.entries();
        pairs.extend(
            self.checked_values(GENRES_FIELD)
                .into_iter()
                .map(|v| (GENRES_FIELD.to_string(), v)),
        );
        pairs
    }
}

/// Encodes pairs as `application/x-www-form-urlencoded` (space becomes `+`).
pub fn encode_query(pairs: &[(String, String)]) -> String {
    let mut serializer = url::form_urlencoded::Serializer::new(String::new());
    for (key, value) in pairs {
        serializer.append_pair(key, value);
    }
    serializer.finish()
}

pub fn build_query(form: &FilterForm) -> String {
    encode_query(&form.query_pairs())
}
