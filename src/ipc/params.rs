use crate::ipc::error::HandlerErr;

pub fn req_i64(params: &serde_json::Value, key: &str) -> Result<i64, HandlerErr> {
    params
        .get(key)
        .and_then(|v| v.as_i64())
        .ok_or_else(|| HandlerErr::bad_params(format!("missing/invalid {key}")))
}

pub fn req_str<'a>(params: &'a serde_json::Value, key: &str) -> Result<&'a str, HandlerErr> {
    params
        .get(key)
        .and_then(|v| v.as_str())
        .ok_or_else(|| HandlerErr::bad_params(format!("missing {key}")))
}

pub fn opt_str<'a>(params: &'a serde_json::Value, key: &str) -> Option<&'a str> {
    params
        .get(key)
        .and_then(|v| v.as_str())
        .map(str::trim)
        .filter(|s| !s.is_empty())
}

pub fn opt_i64_list(params: &serde_json::Value, key: &str) -> Result<Option<Vec<i64>>, HandlerErr> {
    let Some(v) = params.get(key) else {
        return Ok(None);
    };
    if v.is_null() {
        return Ok(None);
    }
    let Some(arr) = v.as_array() else {
        return Err(HandlerErr::bad_params(format!("{key} must be an array")));
    };
    arr.iter()
        .map(|x| {
            x.as_i64()
                .ok_or_else(|| HandlerErr::bad_params(format!("{key} must contain integers")))
        })
        .collect::<Result<Vec<_>, _>>()
        .map(Some)
}
