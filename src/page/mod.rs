use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};

use crate::form::{ControlKind, FilterForm, FormControl, GENRES_FIELD};
use crate::format::Dimension;

/// Element ids the controller binds to.
#[derive(Clone, Debug, PartialEq, Eq, Deserialize, Serialize)]
#[serde(default)]
pub struct ElementIds {
    pub price_slider: String,
    pub min_price: String,
    pub max_price: String,
    pub price_label: String,
    pub size_slider: String,
    pub min_size: String,
    pub max_size: String,
    pub size_label: String,
    pub form: String,
    pub listing: String,
}

impl Default for ElementIds {
    fn default() -> Self {
        Self {
            price_slider: "price-slider".to_string(),
            min_price: "min-price".to_string(),
            max_price: "max-price".to_string(),
            price_label: "price-range-label".to_string(),
            size_slider: "size-slider".to_string(),
            min_size: "min-size".to_string(),
            max_size: "max-size".to_string(),
            size_label: "size-range-label".to_string(),
            form: "filter-form".to_string(),
            listing: "games-list".to_string(),
        }
    }
}

/// Ids bound for one slider dimension.
#[derive(Clone, Copy, Debug)]
pub struct SliderIds<'a> {
    pub container: &'a str,
    pub min_input: &'a str,
    pub max_input: &'a str,
    pub label: &'a str,
}

impl ElementIds {
    pub fn slider(&self, dimension: Dimension) -> SliderIds<'_> {
        match dimension {
            Dimension::Price => SliderIds {
                container: &self.price_slider,
                min_input: &self.min_price,
                max_input: &self.max_price,
                label: &self.price_label,
            },
            Dimension::Size => SliderIds {
                container: &self.size_slider,
                min_input: &self.min_size,
                max_input: &self.max_size,
                label: &self.size_label,
            },
        }
    }
}

/// The server-rendered page the controller works against.
#[derive(Clone, Debug, Default, PartialEq, Serialize)]
pub struct Page {
    form: FilterForm,
    slider_containers: BTreeSet<String>,
    labels: BTreeMap<String, String>,
    containers: BTreeMap<String, String>,
}

impl Page {
    pub fn new(form: FilterForm) -> Self {
        Self {
            form,
            ..Self::default()
        }
    }

    pub fn with_slider_container(mut self, id: &str) -> Self {
        self.slider_containers.insert(id.to_string());
        self
    }

    pub fn with_label(mut self, id: &str, text: &str) -> Self {
        self.labels.insert(id.to_string(), text.to_string());
        self
    }

    pub fn with_container(mut self, id: &str, html: &str) -> Self {
        self.containers.insert(id.to_string(), html.to_string());
        self
    }

    /// Standard catalogue layout: title search, one checkbox per genre, the
    /// price slider and, when `with_size` is set, the size slider.
    pub fn catalogue(ids: &ElementIds, genres: &[String], with_size: bool) -> Self {
        let mut form = FilterForm::new(ids.form.clone());
        form.push(FormControl::new("title", "title", ControlKind::Search, ""));
        for genre in genres {
            let base = genre_control_id(genre);
            let mut id = base.clone();
            let mut n = 2;
            while form.control(&id).is_some() {
                id = format!("{base}-{n}");
                n += 1;
            }
            form.push(FormControl::checkbox(&id, GENRES_FIELD, genre));
        }
        form.push(FormControl::hidden(&ids.min_price, "min_price"));
        form.push(FormControl::hidden(&ids.max_price, "max_price"));
        if with_size {
            form.push(FormControl::hidden(&ids.min_size, "min_size"));
            form.push(FormControl::hidden(&ids.max_size, "max_size"));
        }

        let mut page = Page::new(form)
            .with_slider_container(&ids.price_slider)
            .with_label(&ids.price_label, "")
            .with_container(&ids.listing, "");
        if with_size {
            page = page
                .with_slider_container(&ids.size_slider)
                .with_label(&ids.size_label, "");
        }
        page
    }

    pub fn has_element(&self, id: &str) -> bool {
        self.form.id == id
            || self.form.control(id).is_some()
            || self.slider_containers.contains(id)
            || self.labels.contains_key(id)
            || self.containers.contains_key(id)
    }

    pub fn form(&self) -> &FilterForm {
        &self.form
    }

    pub fn form_mut(&mut self) -> &mut FilterForm {
        &mut self.form
    }

    pub fn is_slider_container(&self, id: &str) -> bool {
        self.slider_containers.contains(id)
    }

    /// The nearest slider container at or above `id`, the way `closest()` resolves it.
    pub fn closest_slider(&self, id: &str) -> Option<&str> {
        let mut current = id;
        for _ in 0..=self.form.controls.len() {
            if let Some(found) = self.slider_containers.get(current) {
                return Some(found.as_str());
            }
            current = self.form.control(current)?.container.as_deref()?;
        }
        None
    }

    pub fn text_content(&self, id: &str) -> Option<&str> {
        self.labels.get(id).map(|s| s.as_str())
    }

    pub fn set_text_content(&mut self, id: &str, text: String) -> bool {
        match self.labels.get_mut(id) {
            Some(slot) => {
                *slot = text;
                true
            }
            None => false,
        }
    }

    pub fn inner_html(&self, id: &str) -> Option<&str> {
        self.containers.get(id).map(|s| s.as_str())
    }

    /// Replaces the container's contents verbatim; no escaping is applied.
    pub fn set_inner_html(&mut self, id: &str, html: String) -> bool {
        match self.containers.get_mut(id) {
            Some(slot) => {
                *slot = html;
                true
            }
            None => false,
        }
    }

    pub fn set_value(&mut self, id: &str, value: String) -> bool {
        match self.form.control_mut(id) {
            Some(control) => {
                control.value = value;
                true
            }
            None => false,
        }
    }
}

pub fn genre_control_id(genre: &str) -> String {
    let slug: String = genre
        .trim()
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() {
                c.to_ascii_lowercase()
            } else {
                '-'
            }
        })
        .collect();
    format!("genre-{slug}")
}
