//! Messages of package `pkg` and the generated service code.

#[derive(Clone, PartialEq, ::prost::Message, ::serde::Serialize, ::serde::Deserialize)]
#[serde(default)]
pub struct HelloReq {
    #[prost(string, tag = "1")]
    pub name: ::prost::alloc::string::String,
    #[prost(int64, repeated, tag = "2")]
    pub ids: ::prost::alloc::vec::Vec<i64>,
    #[prost(bool, tag = "3")]
    pub on: bool,
}

#[derive(Clone, PartialEq, ::prost::Message, ::serde::Serialize, ::serde::Deserialize)]
#[serde(default)]
pub struct HelloReply {
    #[prost(string, tag = "1")]
    pub message: ::prost::alloc::string::String,
    #[prost(int64, repeated, tag = "2")]
    pub ids: ::prost::alloc::vec::Vec<i64>,
    #[prost(bool, tag = "3")]
    pub on: bool,
}

impl HelloReq {
    /// Rejects the reserved name `invalid`.
    pub fn validate(&self) -> Result<(), String> {
        if self.name == "invalid" {
            return Err("name: value is reserved".to_string());
        }
        Ok(())
    }
}

include!(concat!(env!("OUT_DIR"), "/greeter.rpc.rs"));
