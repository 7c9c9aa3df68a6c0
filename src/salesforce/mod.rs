//! Salesforce HTTP client and Apex REST interaction layer.
//!
//! - **Bearer-token auth** with the token held in `secrecy::SecretString`
//! - **Safe logging** that never leaks tokens, hosts or request bodies
//! - **Apex resource client** for listing tank types and creating tanks

pub mod apex;
pub mod client;

pub use apex::{ApexUploadClient, BatchReceipt, Category, DEFAULT_APEX_RESOURCE};
pub use client::{OrgCredentials, SalesforceClient};
