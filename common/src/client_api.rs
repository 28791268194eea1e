//! A module with client-server connection utilities.

use crate::{ComparisonData, ComparisonResultData, ErrorData, NewPhraseData, PhraseData};
use anyhow::{Context, Result, anyhow, bail};
use reqwest::blocking::{Client, Response};

/// Turn a non-success response into an error carrying the server's message.
fn check_response(response: Response) -> Result<Response> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    match response.json::<ErrorData>() {
        Ok(body) => bail!("Server returned an error ({status}): {}", body.message),
        Err(e) => bail!("Server returned an error ({status}) that could not be read: {e}"),
    }
}

/// Request a random pair of phrases to judge.
pub fn get_pair_from_server(client: &Client, api_base: &str) -> Result<[PhraseData; 2]> {
    let url = format!("{api_base}/api/phrases/compare");
    let response = client.get(url).send().context("Network error")?;
    let phrases: Vec<PhraseData> = check_response(response)?
        .json()
        .context("Could not parse phrase pair")?;
    let count = phrases.len();
    <[PhraseData; 2]>::try_from(phrases)
        .map_err(|_| anyhow!("Expected 2 phrases from the server, got {count}"))
}

/// Create a new phrase.
pub fn submit_phrase_to_server(client: &Client, api_base: &str, text: &str) -> Result<PhraseData> {
    let url = format!("{api_base}/api/phrases");
    let body = NewPhraseData {
        text: Some(text.to_string()),
    };
    let response = client.post(url).json(&body).send().context("Network error")?;
    check_response(response)?
        .json()
        .context("Could not parse created phrase")
}

/// Record which of two phrases won.
pub fn submit_comparison_to_server(
    client: &Client,
    api_base: &str,
    phrase1_id: u32,
    phrase2_id: u32,
    winner_id: u32,
) -> Result<ComparisonResultData> {
    let url = format!("{api_base}/api/phrases/compare");
    let body = ComparisonData {
        phrase1_id: Some(phrase1_id),
        phrase2_id: Some(phrase2_id),
        winner_id: Some(winner_id),
    };
    let response = client.post(url).json(&body).send().context("Network error")?;
    check_response(response)?
        .json()
        .context("Could not parse comparison result")
}

/// Fetch every phrase, highest rating first.
pub fn get_rankings_from_server(client: &Client, api_base: &str) -> Result<Vec<PhraseData>> {
    let url = format!("{api_base}/api/phrases/ranked");
    let response = client.get(url).send().context("Network error")?;
    check_response(response)?
        .json()
        .context("Could not parse rankings")
}
