// ABOUTME: GoHighLevel (LeadConnector) CRM adapter counting leads and won opportunities
// ABOUTME: Searches contacts by dateAdded range and drains opportunity cursors with the Version header
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Pierre Fitness Intelligence

use std::collections::BTreeMap;

use async_trait::async_trait;
use chrono::NaiveDate;
use serde::Deserialize;
use serde_json::{json, Value};
use tracing::{debug, info};

use crate::constants::platforms::{
    GOHIGHLEVEL_API_BASE_URL, GOHIGHLEVEL_API_VERSION, GOHIGHLEVEL_VERSION_HEADER,
};
use crate::constants::tuning::DEFAULT_PAGE_SIZE;
use crate::core::{AdapterContext, PlatformAdapter};
use crate::errors::PlatformResult;
use crate::http_client::classify_http_failure;
use crate::models::date_range::parse_date;
use crate::models::{
    Breakdown, BreakdownRow, DateRange, FetchOptions, MetricTotals, MetricsEnvelope, Platform,
};
use crate::normalize::snake_key;
use crate::pagination::{collect_all, drain_pages, Page};

#[derive(Debug, Deserialize)]
struct ContactSearchPage {
    #[serde(default)]
    contacts: Vec<Contact>,
}

#[derive(Debug, Deserialize)]
struct OpportunitiesPage {
    #[serde(default)]
    opportunities: Vec<Opportunity>,
    #[serde(default)]
    meta: Option<PageMeta>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PageMeta {
    start_after_id: Option<String>,
    start_after: Option<Value>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Contact {
    date_added: Option<String>,
    source: Option<String>,
    /// Sort values of this contact, echoed back to fetch the following page
    #[serde(default)]
    search_after: Option<Value>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Opportunity {
    #[serde(default)]
    status: String,
    source: Option<String>,
    last_status_change_at: Option<String>,
    updated_at: Option<String>,
    created_at: Option<String>,
}

impl Opportunity {
    /// Day the deal was marked won, falling back to the last update
    fn won_on(&self) -> Option<NaiveDate> {
        [
            &self.last_status_change_at,
            &self.updated_at,
            &self.created_at,
        ]
        .into_iter()
        .flatten()
        .find_map(|raw| parse_date(raw).ok())
    }
}

/// `POST /contacts/search` body for contacts added within `date_range`
fn contact_search_body(location_id: &str, date_range: &DateRange, search_after: Option<Value>) -> Value {
    let mut body = json!({
        "locationId": location_id,
        "pageLimit": DEFAULT_PAGE_SIZE,
        "filters": [{
            "field": "dateAdded",
            "operator": "range",
            "value": {
                "gte": format!("{}T00:00:00.000Z", date_range.start_str()),
                "lte": format!("{}T23:59:59.999Z", date_range.end_str()),
            }
        }],
        "sort": [{"field": "dateAdded", "direction": "asc"}],
    });
    if let (Some(after), Some(fields)) = (search_after, body.as_object_mut()) {
        fields.insert("searchAfter".to_owned(), after);
    }
    body
}

/// Cursor for the next search page: the last contact's sort values
fn search_cursor(contacts: &[Contact]) -> Option<String> {
    if contacts.len() < DEFAULT_PAGE_SIZE as usize {
        return None;
    }
    contacts
        .last()?
        .search_after
        .as_ref()
        .filter(|after| !after.is_null())
        .map(Value::to_string)
}

/// Cursor encoding for the two-part `startAfterId` / `startAfter` pair
fn encode_cursor(meta: Option<PageMeta>, items_on_page: usize) -> Option<String> {
    if items_on_page < DEFAULT_PAGE_SIZE as usize {
        return None;
    }
    let meta = meta?;
    let id = meta.start_after_id.filter(|id| !id.is_empty())?;
    let after = match meta.start_after {
        Some(Value::Number(n)) => n.to_string(),
        Some(Value::String(s)) => s,
        _ => String::new(),
    };
    Some(format!("{id}|{after}"))
}

fn decode_cursor(cursor: &str) -> (String, Option<String>) {
    match cursor.split_once('|') {
        Some((id, after)) if !after.is_empty() => (id.to_owned(), Some(after.to_owned())),
        Some((id, _)) => (id.to_owned(), None),
        None => (cursor.to_owned(), None),
    }
}

fn source_key(source: Option<&str>) -> String {
    source.map_or_else(|| "unknown".to_owned(), snake_key)
}

/// GoHighLevel CRM adapter
#[derive(Debug, Clone)]
pub struct GoHighLevelAdapter {
    context: AdapterContext,
    base_url: String,
}

impl GoHighLevelAdapter {
    /// Adapter against the production LeadConnector API
    #[must_use]
    pub fn new(context: AdapterContext) -> Self {
        Self {
            context,
            base_url: GOHIGHLEVEL_API_BASE_URL.to_owned(),
        }
    }

    /// Point at another API host (tests, proxies)
    #[must_use]
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_owned();
        self
    }

    /// Contacts added within `date_range`, filtered server side
    async fn search_contacts(
        &self,
        access_token: &str,
        location_id: &str,
        date_range: &DateRange,
    ) -> PlatformResult<Vec<Contact>> {
        let url = format!("{}/contacts/search", self.base_url);
        let context = &self.context;
        let url = &url;

        let stream = drain_pages(Platform::GoHighLevel, move |cursor: Option<String>| async move {
            let search_after = cursor
                .as_deref()
                .and_then(|raw| serde_json::from_str::<Value>(raw).ok());
            let body = contact_search_body(location_id, date_range, search_after);

            let page: ContactSearchPage = context
                .request_json(Platform::GoHighLevel, classify_http_failure, |client| {
                    client
                        .post(url)
                        .bearer_auth(access_token)
                        .header(GOHIGHLEVEL_VERSION_HEADER, GOHIGHLEVEL_API_VERSION)
                        .json(&body)
                })
                .await?;
            let next = search_cursor(&page.contacts);
            Ok(Page {
                items: page.contacts,
                next,
            })
        });
        collect_all(stream).await
    }

    /// Won opportunities of the location, drained over `startAfterId` cursors
    async fn won_opportunities(
        &self,
        access_token: &str,
        location_id: &str,
    ) -> PlatformResult<Vec<Opportunity>> {
        let url = format!("{}/opportunities/search", self.base_url);
        let limit = DEFAULT_PAGE_SIZE.to_string();
        let context = &self.context;
        let url = &url;
        let limit = limit.as_str();

        let stream = drain_pages(Platform::GoHighLevel, move |cursor: Option<String>| async move {
            let mut query: Vec<(&str, String)> = vec![
                ("location_id", location_id.to_owned()),
                ("status", "won".to_owned()),
                ("limit", limit.to_owned()),
            ];
            if let Some(cursor) = cursor.as_deref() {
                let (id, after) = decode_cursor(cursor);
                query.push(("startAfterId", id));
                if let Some(after) = after {
                    query.push(("startAfter", after));
                }
            }

            let page: OpportunitiesPage = context
                .request_json(Platform::GoHighLevel, classify_http_failure, |client| {
                    client
                        .get(url)
                        .bearer_auth(access_token)
                        .header(GOHIGHLEVEL_VERSION_HEADER, GOHIGHLEVEL_API_VERSION)
                        .query(&query)
                })
                .await?;
            let next = encode_cursor(page.meta, page.opportunities.len());
            Ok(Page {
                items: page.opportunities,
                next,
            })
        });
        collect_all(stream).await
    }
}

#[async_trait]
impl PlatformAdapter for GoHighLevelAdapter {
    fn platform(&self) -> Platform {
        Platform::GoHighLevel
    }

    async fn fetch_metrics(
        &self,
        access_token: &str,
        account_id: &str,
        date_range: &DateRange,
        options: &FetchOptions,
    ) -> PlatformResult<MetricsEnvelope> {
        info!(platform = %Platform::GoHighLevel, location_id = account_id, range = %date_range, "searching contacts and opportunities");

        let contacts = self
            .search_contacts(access_token, account_id, date_range)
            .await?;
        let opportunities = self.won_opportunities(access_token, account_id).await?;

        // The search filter is authoritative; this only guards day boundaries
        let leads: Vec<&Contact> = contacts
            .iter()
            .filter(|contact| {
                contact
                    .date_added
                    .as_deref()
                    .and_then(|raw| parse_date(raw).ok())
                    .is_some_and(|day| date_range.contains(day))
            })
            .collect();
        let won: Vec<&Opportunity> = opportunities
            .iter()
            .filter(|deal| deal.status.eq_ignore_ascii_case("won"))
            .filter(|deal| deal.won_on().is_some_and(|day| date_range.contains(day)))
            .collect();
        debug!(
            platform = %Platform::GoHighLevel,
            contacts = contacts.len(),
            leads = leads.len(),
            won = won.len(),
            "crm records filtered"
        );

        let totals = MetricTotals {
            leads: leads.len() as u64,
            conversions: won.len() as u64,
            ..MetricTotals::default()
        };
        let mut envelope = MetricsEnvelope::new(Platform::GoHighLevel, account_id, *date_range, totals);

        if options.wants(Breakdown::Source) {
            let mut grouped: BTreeMap<String, MetricTotals> = BTreeMap::new();
            for contact in &leads {
                grouped.entry(source_key(contact.source.as_deref())).or_default().leads += 1;
            }
            for deal in &won {
                grouped.entry(source_key(deal.source.as_deref())).or_default().conversions += 1;
            }
            let rows = grouped
                .into_iter()
                .map(|(key, totals)| BreakdownRow::new(key, totals))
                .collect();
            envelope = envelope.with_breakdown(Breakdown::Source, rows);
        }
        Ok(envelope)
    }
}
