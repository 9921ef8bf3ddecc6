//! Parameter panel model.
//!
//! Each control is bound to one callback that turns the new value into a
//! change the owning view applies. Widgets only read [`Panel::controls`] and
//! report user edits back through [`Panel::dispatch`].

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ControlId(usize);

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ControlValue {
    Bool(bool),
    Number(f32),
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PanelEvent {
    pub control: ControlId,
    pub value: ControlValue,
}

#[derive(Debug, Clone)]
pub enum ControlKind<C> {
    Toggle {
        value: bool,
        on_change: fn(bool) -> C,
    },
    Range {
        value: f32,
        min: f32,
        max: f32,
        step: f32,
        on_change: fn(f32) -> C,
    },
}

#[derive(Debug, Clone)]
pub struct Control<C> {
    pub name: &'static str,
    pub kind: ControlKind<C>,
}

impl<C> Control<C> {
    pub fn value(&self) -> ControlValue {
        match self.kind {
            ControlKind::Toggle { value, .. } => ControlValue::Bool(value),
            ControlKind::Range { value, .. } => ControlValue::Number(value),
        }
    }
}

/// Snaps `value` to the step grid anchored at `min`, then clamps to the range.
pub fn snap_to_step(value: f32, min: f32, max: f32, step: f32) -> f32 {
    let snapped = if step > 0.0 {
        min + ((value - min) / step).round() * step
    } else {
        value
    };
    // Keep grid values like 0.3 from drifting to 0.30000001.
    let snapped = (snapped * 1.0e6).round() / 1.0e6;
    snapped.clamp(min, max)
}

#[derive(Debug, Clone)]
pub struct Panel<C> {
    title: &'static str,
    controls: Vec<Control<C>>,
    destroyed: bool,
}

impl<C> Panel<C> {
    pub fn new(title: &'static str) -> Self {
        Self {
            title,
            controls: Vec::new(),
            destroyed: false,
        }
    }

    pub fn title(&self) -> &'static str {
        self.title
    }

    pub fn add_toggle(&mut self, name: &'static str, value: bool, on_change: fn(bool) -> C) -> ControlId {
        self.push(Control {
            name,
            kind: ControlKind::Toggle { value, on_change },
        })
    }

    pub fn add_range(
        &mut self,
        name: &'static str,
        value: f32,
        (min, max): (f32, f32),
        step: f32,
        on_change: fn(f32) -> C,
    ) -> ControlId {
        self.push(Control {
            name,
            kind: ControlKind::Range {
                value: snap_to_step(value, min, max, step),
                min,
                max,
                step,
                on_change,
            },
        })
    }

    fn push(&mut self, control: Control<C>) -> ControlId {
        self.controls.push(control);
        ControlId(self.controls.len() - 1)
    }

    pub fn controls(&self) -> impl Iterator<Item = (ControlId, &Control<C>)> {
        self.controls.iter().enumerate().map(|(i, c)| (ControlId(i), c))
    }

    pub fn control(&self, id: ControlId) -> Option<&Control<C>> {
        self.controls.get(id.0)
    }

    pub fn find(&self, name: &str) -> Option<ControlId> {
        self.controls
            .iter()
            .position(|c| c.name == name)
            .map(ControlId)
    }

    /// Reflects a value changed elsewhere without invoking the callback.
    pub fn set_value(&mut self, id: ControlId, new: ControlValue) -> bool {
        let Some(control) = self.controls.get_mut(id.0) else {
            return false;
        };
        match (&mut control.kind, new) {
            (ControlKind::Toggle { value, .. }, ControlValue::Bool(v)) => {
                *value = v;
                true
            }
            (
                ControlKind::Range {
                    value,
                    min,
                    max,
                    step,
                    ..
                },
                ControlValue::Number(v),
            ) if v.is_finite() => {
                *value = snap_to_step(v, *min, *max, *step);
                true
            }
            _ => false,
        }
    }

    /// Stores the user's value and returns what the bound callback produced.
    /// Values of the wrong kind and edits to a destroyed panel are dropped.
    pub fn dispatch(&mut self, event: PanelEvent) -> Option<C> {
        if self.destroyed {
            return None;
        }
        let control = self.controls.get_mut(event.control.0)?;

        match (&mut control.kind, event.value) {
            (ControlKind::Toggle { value, on_change }, ControlValue::Bool(new)) => {
                *value = new;
                Some(on_change(new))
            }
            (
                ControlKind::Range {
                    value,
                    min,
                    max,
                    step,
                    on_change,
                },
                ControlValue::Number(new),
            ) => {
                if !new.is_finite() {
                    return None;
                }
                let snapped = snap_to_step(new, *min, *max, *step);
                *value = snapped;
                Some(on_change(snapped))
            }
            _ => None,
        }
    }

    /// Unbinds every control.
    pub fn destroy(&mut self) {
        self.controls.clear();
        self.destroyed = true;
    }

    pub fn is_destroyed(&self) -> bool {
        self.destroyed
    }
}
