use std::collections::VecDeque;
use std::sync::Arc;

use axum::{
    Form, Json,
    extract::{FromRef, Path, State},
    http::{HeaderMap, StatusCode, header},
    response::{AppendHeaders, Html, IntoResponse, Redirect, Response},
};
use serde::Deserialize;
use serde_json::json;

use crate::{
    etherscan::EtherscanClient,
    primitives::{Currency, TxRecord, is_valid_address, wei_to_ether},
    rates::RateSource,
    session::{SESSION_COOKIE, Sessions},
    store::TxStore,
};

#[derive(Clone)]
pub struct HandlerState {
    pub store: TxStore,
    pub etherscan: EtherscanClient,
    pub rates: Arc<dyn RateSource>,
    pub sessions: Arc<Sessions>,
}

impl FromRef<HandlerState> for Arc<dyn RateSource> {
    fn from_ref(state: &HandlerState) -> Self {
        state.rates.clone()
    }
}

#[derive(Debug, Deserialize)]
pub struct SearchForm {
    pub address: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct ConversionForm {
    pub amount: Option<String>,
    pub from: Option<String>,
    pub to: Option<String>,
}

pub async fn health() -> &'static str {
    "Online"
}

/// Home: network-wide stats plus the search form. Bumps the session's
/// visit counter. A failed stat lookup degrades to "unavailable" rather
/// than taking the page down.
pub async fn home(State(state): State<HandlerState>, headers: HeaderMap) -> impl IntoResponse {
    let sid = state.sessions.open(&headers).await;
    let visits = state
        .sessions
        .update(&sid, |session| {
            session.num_visits += 1;
            session.num_visits
        })
        .await;

    let supply_ether = match state.etherscan.supply().await.and_then(|s| s.net_wei()) {
        Ok(wei) => Some(wei_to_ether(wei)),
        Err(e) => {
            tracing::warn!("supply lookup failed: {}", e);
            None
        }
    };
    let spot_usd = match state.rates.rate(Currency::Eth, Currency::Usd).await {
        Ok(rate) => Some(rate),
        Err(e) => {
            tracing::warn!("spot price lookup failed: {}", e);
            None
        }
    };
    let market_cap = match (supply_ether, spot_usd) {
        (Some(supply), Some(spot)) => Some(supply * spot),
        _ => None,
    };
    let gas_price = match state.etherscan.gas_price().await {
        Ok(wei) => Some(wei_to_ether(wei)),
        Err(e) => {
            tracing::warn!("gas price lookup failed: {}", e);
            None
        }
    };
    let block_number = match state.etherscan.block_number().await {
        Ok(number) => Some(number),
        Err(e) => {
            tracing::warn!("block number lookup failed: {}", e);
            None
        }
    };
    let node_count = match state.etherscan.node_count().await {
        Ok(count) => Some(count),
        Err(e) => {
            tracing::warn!("node count lookup failed: {}", e);
            None
        }
    };

    let body = format!(
        r#"<h1>Ethereum Explorer</h1>
<ul>
<li>Net supply (ETH): {}</li>
<li>Market cap (USD): {}</li>
<li>Gas price (ETH): {}</li>
<li>Block number: {}</li>
<li>Node count: {}</li>
</ul>
<form method="post" action="/address">
<input type="text" name="address" placeholder="0x...">
<button type="submit">Search</button>
</form>
<p>Visits this session: {}</p>"#,
        fmt_stat(supply_ether),
        fmt_stat(market_cap),
        fmt_stat(gas_price),
        fmt_stat(block_number),
        fmt_stat(node_count),
        visits,
    );

    (session_cookie(&sid), Html(page("Ethereum Explorer", &body)))
}

/// Search dispatch. A well-formed address redirects to its lookup view,
/// anything else to the error view.
pub async fn search(Form(form): Form<SearchForm>) -> Redirect {
    match form.address.as_deref() {
        Some(address) if is_valid_address(address) => {
            Redirect::to(&format!("/address/{}", address))
        }
        other => {
            tracing::info!(input = ?other, "rejected address search, redirecting to error view");
            Redirect::to("/error")
        }
    }
}

/// Non-POST requests to the search route go straight to the error view.
pub async fn search_rejected() -> Redirect {
    Redirect::to("/error")
}

/// Address lookup: balance plus transaction history, caching fetched
/// transactions and recording the address in the session search history.
pub async fn address(
    State(state): State<HandlerState>,
    Path(address): Path<String>,
    headers: HeaderMap,
) -> Response {
    let raw_balance = match state.etherscan.balance(&address).await {
        Ok(raw) => raw,
        Err(e) => {
            tracing::warn!(%address, "balance fetch failed, redirecting to error view: {}", e);
            return Redirect::to("/error").into_response();
        }
    };
    // An unparseable balance is the API telling us the address is invalid.
    let balance_wei: u128 = match raw_balance.parse() {
        Ok(wei) => wei,
        Err(_) => {
            tracing::info!(%address, "unparseable balance, redirecting to error view");
            return Redirect::to("/error").into_response();
        }
    };
    let balance = wei_to_ether(balance_wei);

    let transactions = match state.etherscan.transactions(&address).await {
        Ok(records) => records,
        Err(e) => {
            tracing::warn!(%address, "transaction fetch failed: {}", e);
            Vec::new()
        }
    };
    match state.store.insert_new(&transactions).await {
        Ok(inserted) => {
            tracing::info!(%address, inserted, fetched = transactions.len(), "cached transactions")
        }
        Err(e) => tracing::error!(%address, "failed to cache transactions: {}", e),
    }

    let sid = state.sessions.open(&headers).await;
    state
        .sessions
        .update(&sid, |session| session.record_search(&address))
        .await;
    let history = state
        .sessions
        .get(&sid)
        .await
        .unwrap_or_default()
        .search_history;

    let body = render_address(&address, balance, &transactions, &history);
    (session_cookie(&sid), Html(page("Address", &body))).into_response()
}

pub async fn conversion_form() -> Html<String> {
    let body = r#"<h1>Currency conversion</h1>
<form method="post" action="/conversion">
<input type="text" name="amount" placeholder="Amount">
<select name="from"><option>ETH</option><option>USD</option><option>EUR</option><option>GBP</option></select>
<select name="to"><option>USD</option><option>ETH</option><option>EUR</option><option>GBP</option></select>
<button type="submit">Convert</button>
</form>"#;
    Html(page("Conversion", body))
}

/// Convert an amount between two currencies. Validation failures get a
/// 400 with a JSON error body; only a rate-source failure is treated as
/// a server-side problem.
pub async fn convert(
    State(rates): State<Arc<dyn RateSource>>,
    Form(form): Form<ConversionForm>,
) -> Response {
    let Some((amount, from, to)) = validate_conversion(&form) else {
        return (
            StatusCode::BAD_REQUEST,
            Json(json!({"error": "Invalid form"})),
        )
            .into_response();
    };

    match rates.rate(from, to).await {
        Ok(rate) => Json(json!({"converted_amount": amount * rate})).into_response(),
        Err(e) => {
            tracing::error!("rate lookup failed: {}", e);
            (
                StatusCode::BAD_GATEWAY,
                Json(json!({"error": "Rate source unavailable"})),
            )
                .into_response()
        }
    }
}

pub async fn error_page() -> Html<String> {
    Html(page("Error", "<p>An error has occured</p>"))
}

fn validate_conversion(form: &ConversionForm) -> Option<(f64, Currency, Currency)> {
    let amount: f64 = form.amount.as_deref()?.trim().parse().ok()?;
    if !amount.is_finite() || amount <= 0.0 {
        return None;
    }
    let from: Currency = form.from.as_deref()?.parse().ok()?;
    let to: Currency = form.to.as_deref()?.parse().ok()?;
    Some((amount, from, to))
}

fn session_cookie(sid: &str) -> AppendHeaders<[(header::HeaderName, String); 1]> {
    AppendHeaders([(
        header::SET_COOKIE,
        format!("{}={}; Path=/; HttpOnly", SESSION_COOKIE, sid),
    )])
}

fn page(title: &str, body: &str) -> String {
    format!(
        "<!DOCTYPE html>\n<html><head><title>{}</title></head><body>{}</body></html>",
        title, body
    )
}

fn fmt_stat<T: ToString>(value: Option<T>) -> String {
    value
        .map(|v| v.to_string())
        .unwrap_or_else(|| "unavailable".to_string())
}

fn escape_html(value: &str) -> String {
    let mut escaped = String::with_capacity(value.len());
    for c in value.chars() {
        match c {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            _ => escaped.push(c),
        }
    }
    escaped
}

fn render_address(
    address: &str,
    balance: f64,
    transactions: &[TxRecord],
    history: &VecDeque<String>,
) -> String {
    let rows: String = transactions
        .iter()
        .map(|tx| {
            let ether = tx
                .value
                .parse::<u128>()
                .map(wei_to_ether)
                .map(|v| v.to_string())
                .unwrap_or_else(|_| tx.value.clone());
            format!(
                "<tr><td>{}</td><td>{}</td><td>{}</td><td>{}</td></tr>",
                escape_html(&tx.hash),
                escape_html(&tx.from),
                escape_html(&tx.to),
                ether,
            )
        })
        .collect();

    let history_items: String = history
        .iter()
        .map(|entry| {
            let entry = escape_html(entry);
            format!("<li><a href=\"/address/{}\">{}</a></li>", entry, entry)
        })
        .collect();

    format!(
        r#"<h1>Address {}</h1>
<p>Balance: {} ETH</p>
<table>
<tr><th>Hash</th><th>From</th><th>To</th><th>Value (ETH)</th></tr>
{}
</table>
<h2>Recent searches</h2>
<ul>{}</ul>"#,
        escape_html(address),
        balance,
        rows,
        history_items,
    )
}
