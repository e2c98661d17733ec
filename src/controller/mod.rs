//! Filter controller: binds the range sliders, mirrors their values into the
//! form, turns form events into listing requests and swaps responses into the
//! listing container.
//!
//! The controller does no I/O. Every event that warrants a refresh yields a
//! [`FetchRequest`] for the caller to run, and the caller hands the outcome
//! back through [`FilterController::complete`].

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::fetch::{FetchCompletion, FetchError, FetchRequest};
use crate::form;
use crate::format::{self, Dimension};
use crate::page::{ElementIds, Page};
use crate::slider::{BoundsError, RangeBounds, RangeSlider, SliderOptions};

#[derive(Debug, Error)]
pub enum ControllerError {
    #[error("required element #{id} is missing from the page")]
    MissingElement { id: String },

    #[error("invalid slider bounds: {0}")]
    Bounds(#[from] BoundsError),

    #[error("no form control with id #{id}")]
    UnknownControl { id: String },

    #[error("the page has no {dimension} slider")]
    NoSlider { dimension: Dimension },
}

/// Which responses may replace the listing.
///
/// A plain page script applies every response as it resolves, so a slow
/// early request can overwrite a newer listing. `LatestIssued` is the default
/// and drops such stale responses; `LastResolved` keeps the page-script behavior.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum ResponsePolicy {
    /// Apply a response only when it is newer than the last one applied.
    #[default]
    LatestIssued,
    /// Apply every response in the order they resolve; the last to arrive wins.
    LastResolved,
}

impl ResponsePolicy {
    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_lowercase().as_str() {
            "latest" | "latest-issued" => Some(Self::LatestIssued),
            "last-resolved" | "resolved" => Some(Self::LastResolved),
            _ => None,
        }
    }
}

#[derive(Clone, Debug)]
pub struct ControllerConfig {
    pub price: RangeBounds,
    pub size: Option<RangeBounds>,
    pub ids: ElementIds,
    pub policy: ResponsePolicy,
}

impl Default for ControllerConfig {
    fn default() -> Self {
        Self {
            price: RangeBounds::full(0.0, 100.0),
            size: None,
            ids: ElementIds::default(),
            policy: ResponsePolicy::default(),
        }
    }
}

/// DOM events the controller listens for.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum FormEvent {
    SliderUpdate(Dimension),
    Input { target: String },
    Change { target: String },
    Submit,
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct EventOutcome {
    pub prevent_default: bool,
    pub request: Option<FetchRequest>,
}

impl EventOutcome {
    fn fetch(request: FetchRequest) -> Self {
        Self {
            prevent_default: false,
            request: Some(request),
        }
    }
}

#[derive(Debug)]
pub enum ResponseDisposition {
    Applied,
    Discarded { latest_applied: u64 },
    Failed(FetchError),
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize)]
pub struct ControllerStats {
    pub issued: u64,
    pub applied: u64,
    pub discarded: u64,
    pub failed: u64,
}

#[derive(Debug)]
pub struct FilterController {
    ids: ElementIds,
    page: Page,
    price: RangeSlider,
    size: Option<RangeSlider>,
    policy: ResponsePolicy,
    next_seq: u64,
    last_applied: Option<u64>,
    stats: ControllerStats,
}

fn require(page: &Page, id: &str) -> Result<(), ControllerError> {
    if page.has_element(id) {
        Ok(())
    } else {
        Err(ControllerError::MissingElement { id: id.to_string() })
    }
}

impl FilterController {
    /// Creates the sliders and binds them. Binding an `update` listener fires
    /// it once, so the returned requests hold one initial refresh per slider.
    pub fn init(
        config: ControllerConfig,
        page: Page,
    ) -> Result<(Self, Vec<FetchRequest>), ControllerError> {
        let ids = config.ids;
        require(&page, &ids.form)?;
        require(&page, &ids.listing)?;

        let mut dimensions = vec![(Dimension::Price, config.price)];
        if let Some(size) = config.size {
            dimensions.push((Dimension::Size, size));
        }
        for (dimension, _) in dimensions.iter() {
            let slider_ids = ids.slider(*dimension);
            for id in [
                slider_ids.container,
                slider_ids.min_input,
                slider_ids.max_input,
                slider_ids.label,
            ] {
                require(&page, id)?;
            }
        }

        let price = RangeSlider::create(
            ids.price_slider.clone(),
            config.price,
            SliderOptions::for_dimension(Dimension::Price),
        )?;
        let size = match config.size {
            Some(bounds) => Some(RangeSlider::create(
                ids.size_slider.clone(),
                bounds,
                SliderOptions::for_dimension(Dimension::Size),
            )?),
            None => None,
        };

        let mut controller = Self {
            ids,
            page,
            price,
            size,
            policy: config.policy,
            next_seq: 0,
            last_applied: None,
            stats: ControllerStats::default(),
        };

        let mut requests = Vec::new();
        for (dimension, _) in dimensions.iter() {
            if let Some(request) = controller.handle(FormEvent::SliderUpdate(*dimension)).request {
                requests.push(request);
            }
        }

        // The widget may not report its first update synchronously, so the
        // labels start from the raw start bounds regardless.
        for (dimension, bounds) in dimensions {
            controller.page.set_text_content(
                controller.ids.slider(dimension).label,
                format::initial_label(dimension, bounds.start_min, bounds.start_max),
            );
        }

        debug!(
            sliders = requests.len(),
            policy = ?controller.policy,
            "filter controller bound"
        );
        Ok((controller, requests))
    }

    pub fn page(&self) -> &Page {
        &self.page
    }

    pub fn ids(&self) -> &ElementIds {
        &self.ids
    }

    pub fn stats(&self) -> ControllerStats {
        self.stats
    }

    pub fn policy(&self) -> ResponsePolicy {
        self.policy
    }

    pub fn slider(&self, dimension: Dimension) -> Option<&RangeSlider> {
        match dimension {
            Dimension::Price => Some(&self.price),
            Dimension::Size => self.size.as_ref(),
        }
    }

    fn slider_mut(&mut self, dimension: Dimension) -> Result<&mut RangeSlider, ControllerError> {
        match dimension {
            Dimension::Price => Ok(&mut self.price),
            Dimension::Size => self
                .size
                .as_mut()
                .ok_or(ControllerError::NoSlider { dimension }),
        }
    }

    /// The query the form would serialize to right now.
    pub fn current_query(&self) -> String {
        form::build_query(self.page.form())
    }

    /// Moves a slider's handles; the widget then fires `update`.
    pub fn set_slider(
        &mut self,
        dimension: Dimension,
        low: f64,
        high: f64,
    ) -> Result<EventOutcome, ControllerError> {
        self.slider_mut(dimension)?.set(low, high);
        Ok(self.handle(FormEvent::SliderUpdate(dimension)))
    }

    /// Writes a control's value without dispatching any event.
    pub fn set_control_value(&mut self, id: &str, value: &str) -> Result<(), ControllerError> {
        if self.page.set_value(id, value.to_string()) {
            Ok(())
        } else {
            Err(ControllerError::UnknownControl { id: id.to_string() })
        }
    }

    /// Checks or unchecks a control without dispatching any event.
    pub fn set_checked(&mut self, id: &str, checked: bool) -> Result<(), ControllerError> {
        let control = self
            .page
            .form_mut()
            .control_mut(id)
            .ok_or_else(|| ControllerError::UnknownControl { id: id.to_string() })?;
        control.checked = checked;
        Ok(())
    }

    pub fn handle(&mut self, event: FormEvent) -> EventOutcome {
        match event {
            FormEvent::SliderUpdate(dimension) => {
                if !self.mirror(dimension) {
                    return EventOutcome::default();
                }
                EventOutcome::fetch(self.issue())
            }
            FormEvent::Input { target } => {
                if let Some(slider) = self.page.closest_slider(&target) {
                    debug!(control = %target, slider, "input inside slider ignored");
                    return EventOutcome::default();
                }
                EventOutcome::fetch(self.issue())
            }
            FormEvent::Change { .. } => EventOutcome::fetch(self.issue()),
            FormEvent::Submit => EventOutcome {
                prevent_default: true,
                request: None,
            },
        }
    }

    /// Copies the slider's handle values into its hidden inputs and label.
    fn mirror(&mut self, dimension: Dimension) -> bool {
        let Some(slider) = self.slider(dimension) else {
            return false;
        };
        let [low, high] = slider.get();
        let ids = self.ids.slider(dimension);
        self.page
            .set_value(ids.min_input, format::mirror_value(dimension, &low));
        self.page
            .set_value(ids.max_input, format::mirror_value(dimension, &high));
        self.page
            .set_text_content(ids.label, format::range_label(&low, &high));
        true
    }

    fn issue(&mut self) -> FetchRequest {
        let seq = self.next_seq;
        self.next_seq += 1;
        self.stats.issued += 1;
        let query = self.current_query();
        debug!(seq, query = %query, "listing request issued");
        FetchRequest { seq, query }
    }

    /// Applies a finished request to the listing container, subject to the policy.
    pub fn complete(&mut self, completion: FetchCompletion) -> ResponseDisposition {
        let FetchCompletion { seq, result } = completion;
        let html = match result {
            Ok(html) => html,
            Err(e) => {
                self.stats.failed += 1;
                warn!(seq, error = %e, "listing request failed; keeping current listing");
                return ResponseDisposition::Failed(e);
            }
        };

        if self.policy == ResponsePolicy::LatestIssued {
            if let Some(latest) = self.last_applied.filter(|latest| *latest > seq) {
                self.stats.discarded += 1;
                debug!(seq, latest, "stale listing response discarded");
                return ResponseDisposition::Discarded {
                    latest_applied: latest,
                };
            }
        }

        let listing = self.ids.listing.clone();
        let bytes = html.len();
        self.page.set_inner_html(&listing, html);
        self.last_applied = Some(self.last_applied.map_or(seq, |prev| prev.max(seq)));
        self.stats.applied += 1;
        info!(seq, bytes, "listing updated");
        ResponseDisposition::Applied
    }
}
