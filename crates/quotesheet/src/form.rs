//! Mapping between a quote document and the editor form.
//!
//! The editor is a flat HTML form whose field names encode the document's
//! nesting (`groups[0][items][2][price]`). [`QuoteForm`] is the form's own
//! view of the data: every value is kept as typed, rows are never dropped.
//! Normalization happens only when the form is collected back into a
//! [`Quote`].

use std::collections::BTreeMap;
use std::sync::OnceLock;

use regex::Regex;

use crate::error::{Error, Result};
use crate::quote::{parse_number, plain_number, Group, Item, Quote};

/// Name of the submit button that carries the editor action.
pub const ACTION_FIELD: &str = "action";

/// Editor form state, as the operator sees it.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct QuoteForm {
    /// Title input.
    pub title: String,
    /// Client input.
    pub client: String,
    /// Intro textarea.
    pub intro: String,
    /// Group cards in display order.
    pub groups: Vec<GroupForm>,
}

/// One group card.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct GroupForm {
    /// Group label input.
    pub label: String,
    /// Item rows in display order.
    pub items: Vec<ItemForm>,
}

/// One item row.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ItemForm {
    /// Type input.
    pub kind: String,
    /// Origin input.
    pub origin: String,
    /// Price input, as typed.
    pub price: String,
    /// Notes input.
    pub notes: String,
    /// Highlight checkbox.
    pub highlight: bool,
}

/// What the operator asked the editor to do on submit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum EditorAction {
    /// Collect the form and persist it.
    #[default]
    Save,
    /// Append a group with one blank item.
    AddGroup,
    /// Append a blank item to the given group.
    AddItem(usize),
    /// Remove a group card.
    RemoveGroup(usize),
    /// Remove one item row.
    RemoveItem(usize, usize),
    /// Discard edits and reload the stored document.
    Reset,
}

impl EditorAction {
    /// Parse the submit button value (`save`, `reset`, `add-group`,
    /// `add-item:0`, `remove-group:1`, `remove-item:1:3`).
    ///
    /// # Errors
    ///
    /// Returns an error for any other value.
    pub fn parse(raw: &str) -> Result<Self> {
        let mut parts = raw.split(':');
        let verb = parts.next().unwrap_or_default();
        let mut index = || -> Result<usize> {
            parts
                .next()
                .and_then(|p| p.parse().ok())
                .ok_or_else(|| Error::form_field(format!("{ACTION_FIELD}={raw}")))
        };
        let action = match verb {
            "save" => Self::Save,
            "reset" => Self::Reset,
            "add-group" => Self::AddGroup,
            "add-item" => Self::AddItem(index()?),
            "remove-group" => Self::RemoveGroup(index()?),
            "remove-item" => {
                let group = index()?;
                Self::RemoveItem(group, index()?)
            }
            _ => return Err(Error::form_field(format!("{ACTION_FIELD}={raw}"))),
        };
        Ok(action)
    }

    /// The submit button value for this action.
    #[must_use]
    pub fn value(&self) -> String {
        match self {
            Self::Save => "save".to_string(),
            Self::Reset => "reset".to_string(),
            Self::AddGroup => "add-group".to_string(),
            Self::AddItem(g) => format!("add-item:{g}"),
            Self::RemoveGroup(g) => format!("remove-group:{g}"),
            Self::RemoveItem(g, i) => format!("remove-item:{g}:{i}"),
        }
    }
}

fn group_field_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(
            r"^groups\[(\d+)\]\[(?:(label)|items\]\[(\d+)\]\[(type|origin|price|notes|highlight))\]$",
        )
        .expect("Invalid form field pattern")
    })
}

/// Split `groups[G][label]` into `(G, None)` and
/// `groups[G][items][I][field]` into `(G, Some((I, field)))`.
fn parse_field_name(name: &str) -> Option<(usize, Option<(usize, &str)>)> {
    let caps = group_field_pattern().captures(name)?;
    let group = caps.get(1)?.as_str().parse().ok()?;
    if caps.get(2).is_some() {
        return Some((group, None));
    }
    let item = caps.get(3)?.as_str().parse().ok()?;
    let field = caps.get(4)?.as_str();
    Some((group, Some((item, field))))
}

fn checkbox_ticked(value: &str) -> bool {
    !matches!(value.trim(), "" | "off" | "false" | "0")
}

/// Lay a document out as editor form state ("apply").
#[must_use]
pub fn apply(quote: &Quote) -> QuoteForm {
    QuoteForm {
        title: quote.title.clone(),
        client: quote.client.clone(),
        intro: quote.intro.clone(),
        groups: quote
            .groups
            .iter()
            .map(|group| GroupForm {
                label: group.label.clone(),
                items: group
                    .items
                    .iter()
                    .map(|item| ItemForm {
                        kind: item.kind.clone(),
                        origin: item.origin.clone(),
                        price: plain_number(item.price),
                        notes: item.notes.clone(),
                        highlight: item.highlight,
                    })
                    .collect(),
            })
            .collect(),
    }
}

impl QuoteForm {
    /// Decode submitted form fields.
    ///
    /// Indices order groups and items and may have gaps. The [`ACTION_FIELD`]
    /// is split off and returned separately; a submission without one is a
    /// save.
    ///
    /// # Errors
    ///
    /// Returns an error naming the first field that does not belong to the
    /// editor form.
    pub fn from_fields<K, V>(fields: &[(K, V)]) -> Result<(Self, EditorAction)>
    where
        K: AsRef<str>,
        V: AsRef<str>,
    {
        let (form, action) = Self::decode(fields);
        Ok((form, action?))
    }

    /// Decode the fields the editor recognises, skipping any others.
    ///
    /// Used to redisplay a rejected submission without losing what was typed.
    #[must_use]
    pub fn from_known_fields<K, V>(fields: &[(K, V)]) -> Self
    where
        K: AsRef<str>,
        V: AsRef<str>,
    {
        Self::decode(fields).0
    }

    /// Decode every recognised field; the action carries the first rejection.
    fn decode<K, V>(fields: &[(K, V)]) -> (Self, Result<EditorAction>)
    where
        K: AsRef<str>,
        V: AsRef<str>,
    {
        let mut form = Self::default();
        let mut action = Ok(EditorAction::Save);
        let mut rejected: Option<Error> = None;
        let mut groups: BTreeMap<usize, (String, BTreeMap<usize, ItemForm>)> = BTreeMap::new();

        for (name, value) in fields {
            let (name, value) = (name.as_ref(), value.as_ref());
            match name {
                "title" => form.title = value.to_string(),
                "client" => form.client = value.to_string(),
                "intro" => form.intro = value.to_string(),
                ACTION_FIELD => action = EditorAction::parse(value),
                _ => {
                    let Some((group_index, slot)) = parse_field_name(name) else {
                        rejected.get_or_insert_with(|| Error::form_field(name));
                        continue;
                    };
                    let entry = groups.entry(group_index).or_default();
                    let Some((item_index, field)) = slot else {
                        entry.0 = value.to_string();
                        continue;
                    };
                    let item = entry.1.entry(item_index).or_default();
                    match field {
                        "type" => item.kind = value.to_string(),
                        "origin" => item.origin = value.to_string(),
                        "price" => item.price = value.to_string(),
                        "notes" => item.notes = value.to_string(),
                        _ => item.highlight = checkbox_ticked(value),
                    }
                }
            }
        }

        form.groups = groups
            .into_values()
            .map(|(label, items)| GroupForm {
                label,
                items: items.into_values().collect(),
            })
            .collect();
        let action = match rejected {
            Some(err) => Err(err),
            None => action,
        };
        (form, action)
    }

    /// Encode as form fields, indexed from zero in display order.
    ///
    /// Unticked checkboxes are omitted, as a browser would.
    #[must_use]
    pub fn to_fields(&self) -> Vec<(String, String)> {
        let mut fields = vec![
            ("title".to_string(), self.title.clone()),
            ("client".to_string(), self.client.clone()),
            ("intro".to_string(), self.intro.clone()),
        ];
        for (g, group) in self.groups.iter().enumerate() {
            fields.push((group_field(g, "label"), group.label.clone()));
            for (i, item) in group.items.iter().enumerate() {
                fields.push((item_field(g, i, "type"), item.kind.clone()));
                fields.push((item_field(g, i, "origin"), item.origin.clone()));
                fields.push((item_field(g, i, "price"), item.price.clone()));
                fields.push((item_field(g, i, "notes"), item.notes.clone()));
                if item.highlight {
                    fields.push((item_field(g, i, "highlight"), "on".to_string()));
                }
            }
        }
        fields
    }

    /// Read the form back into a normalized document ("collect").
    #[must_use]
    pub fn collect(&self) -> Quote {
        Quote {
            title: self.title.clone(),
            client: self.client.clone(),
            intro: self.intro.clone(),
            groups: self
                .groups
                .iter()
                .map(|group| Group {
                    label: group.label.clone(),
                    items: group
                        .items
                        .iter()
                        .map(|item| Item {
                            kind: item.kind.clone(),
                            origin: item.origin.clone(),
                            price: parse_number(&item.price),
                            notes: item.notes.clone(),
                            highlight: item.highlight,
                        })
                        .collect(),
                })
                .collect(),
            total: None,
        }
        .normalized()
    }

    /// Carry out a non-saving editor action in place.
    ///
    /// Out-of-range indices are ignored; the row is already gone.
    pub fn perform(&mut self, action: EditorAction) {
        match action {
            EditorAction::Save | EditorAction::Reset => {}
            EditorAction::AddGroup => self.add_group(),
            EditorAction::AddItem(g) => self.add_item(g),
            EditorAction::RemoveGroup(g) => {
                if g < self.groups.len() {
                    self.groups.remove(g);
                }
            }
            EditorAction::RemoveItem(g, i) => {
                if let Some(group) = self.groups.get_mut(g) {
                    if i < group.items.len() {
                        group.items.remove(i);
                    }
                }
            }
        }
    }

    /// Append a group seeded with one blank item.
    pub fn add_group(&mut self) {
        self.groups.push(GroupForm {
            label: String::new(),
            items: vec![ItemForm::default()],
        });
    }

    /// Append a blank item to a group.
    pub fn add_item(&mut self, group: usize) {
        if let Some(group) = self.groups.get_mut(group) {
            group.items.push(ItemForm::default());
        }
    }
}

/// Field name for a group-level input.
#[must_use]
pub fn group_field(group: usize, field: &str) -> String {
    format!("groups[{group}][{field}]")
}

/// Field name for an item-level input.
#[must_use]
pub fn item_field(group: usize, item: usize, field: &str) -> String {
    format!("groups[{group}][items][{item}][{field}]")
}
