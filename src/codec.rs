//! Prompt rendering and defensive response parsing. The model is asked
//! for bare JSON but routinely wraps it in prose; parsing slices from the
//! first `{` to the last `}` and decodes strictly. Callers map a
//! [`ParseFailure`] to the safe default for their result type.

use serde::Deserialize;
use serde_json::Value;
use thiserror::Error;

use crate::types::{ApplicationData, NavigationPlan, PageSnapshot, VerificationResult};

/// Task headers embedded in each template. They make prompts
/// self-describing in logs and let the test mock route responses by kind.
pub const VERIFY_TASK: &str = "Verify if the current webpage matches the target state";
pub const NAV_PLAN_TASK: &str = "Create a navigation plan to reach the target state";
pub const FORM_PLAN_TASK: &str = "Create a form fill plan for the application form";
pub const RELEVANCE_TASK: &str = "Rate how well the job listing matches the target position";

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ParseFailure {
    #[error("no JSON object found in model response")]
    NoJsonFound,
    #[error("model JSON failed to decode: {0}")]
    JsonParse(String),
}

impl ParseFailure {
    pub fn reason_code(&self) -> &'static str {
        match self {
            ParseFailure::NoJsonFound => "no_json_found",
            ParseFailure::JsonParse(_) => "json_parse_error",
        }
    }
}

/// Slice the substring between the first `{` and the last `}` and decode
/// it strictly. Never panics, whatever the model produced.
pub fn extract_json(response: &str) -> Result<Value, ParseFailure> {
    let start = response.find('{').ok_or(ParseFailure::NoJsonFound)?;
    let end = response.rfind('}').ok_or(ParseFailure::NoJsonFound)?;
    if end < start {
        return Err(ParseFailure::NoJsonFound);
    }
    serde_json::from_str(&response[start..=end])
        .map_err(|e| ParseFailure::JsonParse(e.to_string()))
}

pub fn parse_verification(response: &str) -> Result<VerificationResult, ParseFailure> {
    let value = extract_json(response)?;
    serde_json::from_value(value).map_err(|e| ParseFailure::JsonParse(e.to_string()))
}

pub fn parse_plan(response: &str) -> Result<NavigationPlan, ParseFailure> {
    let value = extract_json(response)?;
    serde_json::from_value(value).map_err(|e| ParseFailure::JsonParse(e.to_string()))
}

pub fn parse_relevance(response: &str) -> Result<f64, ParseFailure> {
    #[derive(Deserialize)]
    struct RelevanceReply {
        #[serde(default)]
        relevance: f64,
    }
    let value = extract_json(response)?;
    let reply: RelevanceReply =
        serde_json::from_value(value).map_err(|e| ParseFailure::JsonParse(e.to_string()))?;
    Ok(reply.relevance.clamp(0.0, 1.0))
}

fn capped(text: &str, limit: usize) -> String {
    text.chars().take(limit).collect()
}

fn elements_json(snapshot: &PageSnapshot) -> String {
    serde_json::to_string(&snapshot.elements).unwrap_or_else(|_| "[]".to_string())
}

pub fn render_verify(snapshot: &PageSnapshot, target_state: &str, text_limit: usize) -> String {
    format!(
        "You must respond ONLY with a valid JSON object and no additional text or explanation.\n\
         \n\
         Task: {task}.\n\
         \n\
         Current Page Content:\n\
         URL: {url}\n\
         Title: {title}\n\
         Text Content: {text}\n\
         Target State: {target}\n\
         \n\
         Rules:\n\
         1. Analyze whether the current page matches the target state\n\
         2. Identify any missing requirements\n\
         3. Provide a confidence score between 0 and 1\n\
         4. Return ONLY a JSON object with the exact structure below\n\
         \n\
         Required JSON Structure:\n\
         {{\n\
             \"success\": boolean,\n\
             \"confidence\": float,\n\
             \"missing_requirements\": [string]\n\
         }}",
        task = VERIFY_TASK,
        url = snapshot.url,
        title = snapshot.title,
        text = capped(&snapshot.text, text_limit),
        target = target_state,
    )
}

pub fn render_navigation_plan(snapshot: &PageSnapshot, target_state: &str) -> String {
    format!(
        "You must respond ONLY with a valid JSON object and no additional text or explanation.\n\
         \n\
         Task: {task}.\n\
         \n\
         Current Page Information:\n\
         URL: {url}\n\
         Title: {title}\n\
         Elements: {elements}\n\
         Target State: {target}\n\
         \n\
         Rules:\n\
         1. Plan the shortest route from the current state to the target state\n\
         2. Each action must have a specific CSS selector and an action type\n\
         3. Allowed action types: click, fill, select, navigate, wait\n\
         4. Return ONLY a JSON object with the exact structure below\n\
         \n\
         Required JSON Structure:\n\
         {{\n\
             \"status\": \"success\",\n\
             \"actions\": [\n\
                 {{\n\
                     \"type\": string,\n\
                     \"selector\": string,\n\
                     \"value\": string,\n\
                     \"description\": string\n\
                 }}\n\
             ]\n\
         }}",
        task = NAV_PLAN_TASK,
        url = snapshot.url,
        title = snapshot.title,
        elements = elements_json(snapshot),
        target = target_state,
    )
}

pub fn render_form_fill(snapshot: &PageSnapshot, data: &ApplicationData) -> String {
    let application = serde_json::to_string(data).unwrap_or_else(|_| "{}".to_string());
    format!(
        "You must respond ONLY with a valid JSON object and no additional text or explanation.\n\
         \n\
         Task: {task}.\n\
         \n\
         Form Page:\n\
         URL: {url}\n\
         Title: {title}\n\
         Elements: {elements}\n\
         \n\
         Application Data: {application}\n\
         \n\
         Rules:\n\
         1. Produce one action per form field, in fill order\n\
         2. Allowed action types: click, fill, select, navigate, wait\n\
         3. Name the submit control in submit_selector but do NOT click it in the actions\n\
         4. Return ONLY a JSON object with the exact structure below\n\
         \n\
         Required JSON Structure:\n\
         {{\n\
             \"status\": \"success\",\n\
             \"actions\": [\n\
                 {{\n\
                     \"type\": string,\n\
                     \"selector\": string,\n\
                     \"value\": string,\n\
                     \"description\": string\n\
                 }}\n\
             ],\n\
             \"submit_selector\": string\n\
         }}",
        task = FORM_PLAN_TASK,
        url = snapshot.url,
        title = snapshot.title,
        elements = elements_json(snapshot),
        application = application,
    )
}

pub fn render_relevance(listing_json: &str, target_position: &str) -> String {
    format!(
        "You must respond ONLY with a valid JSON object and no additional text or explanation.\n\
         \n\
         Task: {task}.\n\
         \n\
         Job Listing: {listing}\n\
         Target Position: {target}\n\
         \n\
         Required JSON Structure:\n\
         {{\n\
             \"relevance\": float\n\
         }}",
        task = RELEVANCE_TASK,
        listing = listing_json,
        target = target_position,
    )
}
