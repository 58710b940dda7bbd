use serde::{Deserialize, Serialize};

use crate::error::{ensure_non_negative, ensure_positive, PkpdError};

/// Route of administration of a single dose
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum Route {
    /// Instantaneous intravenous bolus
    IvBolus,
    /// Constant-rate intravenous infusion over `duration`
    IvInfusion { duration: f64 },
    /// First-order absorption (oral, intramuscular, ...) with bioavailability `F`
    Extravascular { bioavailability: f64 },
}

impl Route {
    pub fn is_iv(&self) -> bool {
        !matches!(self, Route::Extravascular { .. })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DoseEvent {
    pub start: f64,
    pub amount: f64,
    pub route: Route,
}

impl DoseEvent {
    pub fn new(start: f64, amount: f64, route: Route) -> Self {
        Self {
            start,
            amount,
            route,
        }
    }

    pub fn iv_bolus(start: f64, amount: f64) -> Self {
        Self::new(start, amount, Route::IvBolus)
    }

    pub fn iv_infusion(start: f64, amount: f64, duration: f64) -> Self {
        Self::new(start, amount, Route::IvInfusion { duration })
    }

    pub fn extravascular(start: f64, amount: f64, bioavailability: f64) -> Self {
        Self::new(start, amount, Route::Extravascular { bioavailability })
    }

    pub fn validate(&self) -> Result<(), PkpdError> {
        ensure_non_negative("start time", self.start)?;
        ensure_non_negative("dose", self.amount)?;
        match self.route {
            Route::IvBolus => Ok(()),
            Route::IvInfusion { duration } => ensure_positive("infusion duration", duration),
            Route::Extravascular { bioavailability } => {
                ensure_non_negative("bioavailability", bioavailability)
            }
        }
    }
}

/// A collection of dose events
///
/// Superposed profiles only depend on the start times, so the order in which
/// events were added has no effect on the summed result.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DoseRegimen {
    events: Vec<DoseEvent>,
}

impl DoseRegimen {
    pub fn new(events: Vec<DoseEvent>) -> Result<Self, PkpdError> {
        for event in &events {
            event.validate()?;
        }
        Ok(Self { events })
    }

    pub fn builder() -> DoseRegimenBuilder {
        DoseRegimenBuilder::default()
    }

    pub fn events(&self) -> &[DoseEvent] {
        &self.events
    }

    pub fn len(&self) -> usize {
        self.events.len()
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    pub fn requires_absorption(&self) -> bool {
        self.events.iter().any(|e| !e.route.is_iv())
    }
}

/// Incrementally collects dose events before a simulation run
#[derive(Debug, Clone, Default)]
pub struct DoseRegimenBuilder {
    events: Vec<DoseEvent>,
}

impl DoseRegimenBuilder {
    pub fn add_dose_event(&mut self, event: DoseEvent) -> &mut Self {
        self.events.push(event);
        self
    }

    pub fn dose(mut self, event: DoseEvent) -> Self {
        self.events.push(event);
        self
    }

    /// Repeat the last event `n` more times, every `interval`
    pub fn repeat(mut self, n: usize, interval: f64) -> Self {
        if let Some(last) = self.events.last().copied() {
            for i in 1..=n {
                self.events.push(DoseEvent {
                    start: last.start + interval * i as f64,
                    ..last
                });
            }
        }
        self
    }

    pub fn build(&self) -> Result<DoseRegimen, PkpdError> {
        DoseRegimen::new(self.events.clone())
    }
}
