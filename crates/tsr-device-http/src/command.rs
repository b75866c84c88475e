//! HTTP command payload shape (§6): `{type: GET|POST|PUT|DELETE, url,
//! params?, temporalPriority?, queueId?}`.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum HttpMethod {
	Get,
	Post,
	Put,
	Delete,
}

impl HttpMethod {
	pub fn from_content_type(label: &str) -> Option<Self> {
		match label {
			"GET" => Some(Self::Get),
			"POST" => Some(Self::Post),
			"PUT" => Some(Self::Put),
			"DELETE" => Some(Self::Delete),
			_ => None,
		}
	}
}

/// `tsr_state::Command<K>` specialized to this device: `kind` is the HTTP
/// method, `payload` carries `{url, params}`.
pub type HttpCommand = tsr_state::Command<HttpMethod>;
