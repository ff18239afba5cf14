//! The chart page: one line chart per datetime column plus a category bar
//! chart, rebuilt whenever one of their controls changes.

use serde::Serialize;
use std::collections::BTreeMap;
use std::time::Duration;
use tracing::{debug, error, info, warn};

use crate::chart::{
    datetime_control_id, init_category_chart, init_datetime_chart, update_category_chart,
    update_datetime_chart, ChartHandle, ChartRenderer, ChartSession, Controls,
    CATEGORY_FIELD_SELECTOR, DATETIME_CONTROL_SUFFIXES, FIRST_DATETIME_END_INPUT,
    FIRST_DATETIME_START_INPUT, SORT_DIRECTION_SELECTOR,
};
use crate::data::{FieldType, SourceData};
use crate::error::{ChartError, ChartResult};
use crate::visibility::{apply_legend_action, ClickOutcome, LegendClicks};
use crate::ChartOptions;

/// Which chart a control feeds.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChartTarget {
    Datetime(String),
    Category,
}

struct DatetimeChart<H> {
    field: String,
    session: Option<ChartSession<H>>,
    clicks: LegendClicks,
}

pub struct Dashboard<H> {
    source: SourceData,
    options: ChartOptions,
    datetime: Vec<DatetimeChart<H>>,
    category: Option<ChartSession<H>>,
    listeners: Vec<(String, ChartTarget)>,
}

impl<H: ChartHandle> Dashboard<H> {
    /// Build every chart the dataset supports and register change listeners
    /// for the controls present on the page.
    ///
    /// A chart whose canvas is missing, or whose data cannot be built, is
    /// logged and left out; the rest of the page still initializes.
    pub fn initialize<R>(
        renderer: &mut R,
        source: SourceData,
        controls: &dyn Controls,
        options: ChartOptions,
    ) -> Self
    where
        R: ChartRenderer<Handle = H>,
    {
        let mut listeners = Vec::new();
        let mut datetime = Vec::new();

        let fields: Vec<(usize, String)> = source
            .datetime_fields()
            .map(|(i, name)| (i, name.to_string()))
            .collect();

        for (index, field) in fields {
            let session = match init_datetime_chart(renderer, &source, index, controls, &options) {
                Ok(session) => Some(session),
                Err(e) => {
                    error!(%field, "Failed to initialize datetime chart: {}", e);
                    None
                }
            };

            for suffix in DATETIME_CONTROL_SUFFIXES {
                let id = datetime_control_id(&field, suffix);
                register(&mut listeners, controls, id, ChartTarget::Datetime(field.clone()));
            }

            datetime.push(DatetimeChart {
                field,
                session,
                clicks: LegendClicks::new(Duration::from_millis(options.double_click_ms)),
            });
        }

        let mut category = None;
        if source.has_type(&FieldType::CharField) {
            for id in [CATEGORY_FIELD_SELECTOR, SORT_DIRECTION_SELECTOR] {
                register(&mut listeners, controls, id.to_string(), ChartTarget::Category);
            }
            if source.has_type(&FieldType::DateTimeField) {
                for id in [FIRST_DATETIME_START_INPUT, FIRST_DATETIME_END_INPUT] {
                    register(&mut listeners, controls, id.to_string(), ChartTarget::Category);
                }
            }

            category = match init_category_chart(renderer, &source, controls, &options) {
                Ok(session) => Some(session),
                Err(e) => {
                    error!("Failed to initialize category chart: {}", e);
                    None
                }
            };
        }

        info!(
            datetime_charts = datetime.iter().filter(|c| c.session.is_some()).count(),
            category_chart = category.is_some(),
            listeners = listeners.len(),
            "Dashboard initialized"
        );

        Self {
            source,
            options,
            datetime,
            category,
            listeners,
        }
    }

    /// React to a change event on control `id`.
    ///
    /// Returns `true` when a chart was rebuilt. Failures are logged and
    /// leave the chart as it was.
    pub fn handle_change(&mut self, id: &str, controls: &dyn Controls) -> bool {
        let Some(target) = self.target_of(id).cloned() else {
            debug!(%id, "No listener registered for control");
            return false;
        };

        match self.update(&target, controls) {
            Ok(()) => true,
            Err(e) => {
                error!(%id, "Chart update failed: {}", e);
                false
            }
        }
    }

    fn update(&mut self, target: &ChartTarget, controls: &dyn Controls) -> ChartResult<()> {
        match target {
            ChartTarget::Datetime(field) => {
                let chart = self
                    .datetime
                    .iter_mut()
                    .find(|c| c.field == *field)
                    .and_then(|c| c.session.as_mut())
                    .ok_or_else(|| ChartError::MissingUiElement(format!("{}-canvas", field)))?;
                update_datetime_chart(chart, field, &self.source, controls, &self.options)
            }
            ChartTarget::Category => {
                let session = self
                    .category
                    .as_mut()
                    .ok_or_else(|| ChartError::MissingUiElement("charfield-canvas".to_string()))?;
                update_category_chart(session, &self.source, controls, &self.options)
            }
        }
    }

    /// A click on legend entry `index` of the datetime chart for `field`.
    ///
    /// A double click is applied immediately; a single click waits for
    /// [`Dashboard::legend_timeout`].
    pub fn legend_click(&mut self, field: &str, index: usize) -> Option<ClickOutcome> {
        let chart = self.datetime.iter_mut().find(|c| c.field == field)?;
        let session = chart.session.as_mut()?;
        let outcome = chart.clicks.on_click(index);
        if let ClickOutcome::CancelTimer(action) = outcome {
            apply_legend_action(session.handle.datasets_mut(), action);
            session.handle.update();
        }
        Some(outcome)
    }

    /// The single-click timer for `field` fired.
    pub fn legend_timeout(&mut self, field: &str) -> bool {
        let Some(chart) = self.datetime.iter_mut().find(|c| c.field == field) else {
            return false;
        };
        let (Some(session), Some(action)) = (chart.session.as_mut(), chart.clicks.on_timeout())
        else {
            return false;
        };
        apply_legend_action(session.handle.datasets_mut(), action);
        session.handle.update();
        true
    }

    pub fn target_of(&self, id: &str) -> Option<&ChartTarget> {
        self.listeners
            .iter()
            .find(|(listener, _)| listener == id)
            .map(|(_, target)| target)
    }

    pub fn listeners(&self) -> impl Iterator<Item = &str> {
        self.listeners.iter().map(|(id, _)| id.as_str())
    }

    pub fn datetime_chart(&self, field: &str) -> Option<&ChartSession<H>> {
        self.datetime
            .iter()
            .find(|c| c.field == field)
            .and_then(|c| c.session.as_ref())
    }

    pub fn category_chart(&self) -> Option<&ChartSession<H>> {
        self.category.as_ref()
    }

    pub fn source(&self) -> &SourceData {
        &self.source
    }
}

/// Serializable view of every rendered chart.
#[derive(Debug, Serialize)]
pub struct DashboardSnapshot<'a, H> {
    pub datetime: BTreeMap<&'a str, &'a H>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub category: Option<&'a H>,
}

impl<H: ChartHandle + Serialize> Dashboard<H> {
    pub fn snapshot(&self) -> DashboardSnapshot<'_, H> {
        DashboardSnapshot {
            datetime: self
                .datetime
                .iter()
                .filter_map(|c| c.session.as_ref().map(|s| (c.field.as_str(), &s.handle)))
                .collect(),
            category: self.category.as_ref().map(|s| &s.handle),
        }
    }
}

fn register(
    listeners: &mut Vec<(String, ChartTarget)>,
    controls: &dyn Controls,
    id: String,
    target: ChartTarget,
) {
    if controls.exists(&id) {
        listeners.push((id, target));
    } else {
        warn!(%id, "Control not found, no listener registered");
    }
}
