use gd_core::BrowserError;
use gd_core::BrowserResult;

pub(crate) fn write_u16(out: &mut Vec<u8>, value: u16) {
    out.extend_from_slice(&value.to_be_bytes());
}

pub(crate) fn write_u32(out: &mut Vec<u8>, value: u32) {
    out.extend_from_slice(&value.to_be_bytes());
}

pub(crate) fn write_string_u16(out: &mut Vec<u8>, value: &str, field: &str) -> BrowserResult<()> {
    let len = u16::try_from(value.len()).map_err(|_| {
        BrowserError::new(
            "storage.field_too_large",
            format!("field `{field}` exceeds {} bytes", u16::MAX),
        )
    })?;
    write_u16(out, len);
    out.extend_from_slice(value.as_bytes());
    Ok(())
}

pub(crate) fn read_u16(payload: &[u8], offset: &mut usize, field: &str) -> BrowserResult<u16> {
    let bytes = read_exact(payload, offset, 2, field)?;
    Ok(u16::from_be_bytes([bytes[0], bytes[1]]))
}

pub(crate) fn read_u32(payload: &[u8], offset: &mut usize, field: &str) -> BrowserResult<u32> {
    let bytes = read_exact(payload, offset, 4, field)?;
    Ok(u32::from_be_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]))
}

pub(crate) fn read_string_u16(
    payload: &[u8],
    offset: &mut usize,
    field: &str,
) -> BrowserResult<String> {
    let len = usize::from(read_u16(payload, offset, field)?);
    let bytes = read_exact(payload, offset, len, field)?;
    String::from_utf8(bytes.to_vec()).map_err(|error| {
        BrowserError::new(
            "storage.session_utf8_invalid",
            format!("field `{field}` is not valid UTF-8: {error}"),
        )
    })
}

fn read_exact<'a>(
    payload: &'a [u8],
    offset: &mut usize,
    len: usize,
    field: &str,
) -> BrowserResult<&'a [u8]> {
    let end = offset.checked_add(len).ok_or_else(|| {
        BrowserError::new(
            "storage.session_truncated",
            format!("offset overflow reading `{field}`"),
        )
    })?;
    let Some(bytes) = payload.get(*offset..end) else {
        return Err(BrowserError::new(
            "storage.session_truncated",
            format!("stored session ends inside `{field}`"),
        ));
    };
    *offset = end;
    Ok(bytes)
}
