//! RFC 7396 merge-patch, applied directly to two encoded trees.
//!
//! The target is edited in place; the patch is read-only. Patch members
//! with `null` values delete the matching target member, object values
//! recurse, and everything else is copied over or appended. Label
//! equality is byte-exact when the two label kinds match; across kinds
//! the labels are rendered to canonical text and compared there, so a
//! `textraw` label created by the editor still matches its `text`
//! spelling in a parsed patch.

use alloc::vec::Vec;

use crate::header;
use crate::kind::Kind;
use crate::parse::Parse;
use crate::render;
use crate::text::JsonText;

/// Merge failure: one of the two trees came apart while being walked.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum MergeError {
    BadTarget,
    BadPatch,
}

/// Applies the patch element at `patch[i_patch]` to the target element at
/// `i_target`, accumulating the byte delta on `target` for the caller's
/// ancestor fix-up.
pub(crate) fn merge_patch(
    target: &mut Parse<'_>,
    i_target: usize,
    patch: &[u8],
    i_patch: usize,
) -> Result<(), MergeError> {
    if Kind::from_tag(patch[i_patch]) != Some(Kind::Object) {
        // A non-object patch replaces the target wholesale.
        let (pn, psz) = header::decode(patch, i_patch).ok_or(MergeError::BadPatch)?;
        let (tn, tsz) = target.payload_size(i_target).ok_or(MergeError::BadTarget)?;
        target.blob_edit(i_target, tn + tsz, &patch[i_patch..i_patch + pn + psz]);
        return Ok(());
    }
    if target.kind_at(i_target) != Some(Kind::Object) {
        // Discard the payload and relabel as an empty object.
        let (tn, tsz) = target.payload_size(i_target).ok_or(MergeError::BadTarget)?;
        target.blob_edit(i_target + tn, tsz, &[]);
        target.relabel(i_target, Kind::Object);
    }
    let (pn, psz) = header::decode(patch, i_patch).ok_or(MergeError::BadPatch)?;
    let mut ip = i_patch + pn;
    let ip_end = ip + psz;
    let (tn, tsz) = target.payload_size(i_target).ok_or(MergeError::BadTarget)?;
    let t_start = i_target + tn;
    let t_end_be = t_start + tsz;

    while ip < ip_end {
        let p_label = ip;
        let pl_kind = Kind::from_tag(patch[ip])
            .filter(|k| k.is_text())
            .ok_or(MergeError::BadPatch)?;
        let (npl, szpl) = header::decode(patch, p_label).ok_or(MergeError::BadPatch)?;
        let p_value = p_label + npl + szpl;
        if p_value >= ip_end {
            return Err(MergeError::BadPatch);
        }
        let (npv, szpv) = header::decode(patch, p_value).ok_or(MergeError::BadPatch)?;
        ip = p_value + npv + szpv;
        if ip > ip_end {
            return Err(MergeError::BadPatch);
        }

        // Scan the target object for a member with this label.
        let t_end = usize::try_from(t_end_be as i64 + target.delta)
            .map_err(|_| MergeError::BadTarget)?;
        let mut tc = t_start;
        let mut hit = None;
        while tc < t_end {
            if !target.kind_at(tc).is_some_and(Kind::is_text) {
                return Err(MergeError::BadTarget);
            }
            let tl_kind = target.kind_at(tc).ok_or(MergeError::BadTarget)?;
            let (ntl, sztl) = target.payload_size(tc).ok_or(MergeError::BadTarget)?;
            let t_value = tc + ntl + sztl;
            if t_value >= t_end {
                return Err(MergeError::BadTarget);
            }
            let (ntv, sztv) = target.payload_size(t_value).ok_or(MergeError::BadTarget)?;
            if t_value + ntv + sztv > t_end {
                return Err(MergeError::BadTarget);
            }
            let equal = if tl_kind == pl_kind {
                sztl == szpl
                    && target.blob()[tc + ntl..t_value]
                        == patch[p_label + npl..p_label + npl + szpl]
            } else {
                labels_render_equal(target.blob(), tc, patch, p_label)
            };
            if equal {
                hit = Some((tc, ntl + sztl, t_value, ntv + sztv));
                break;
            }
            tc = t_value + ntv + sztv;
        }

        let pv_null = patch[p_value] & 0x0f == Kind::Null as u8;
        if let Some((tl, l_total, tv, v_total)) = hit {
            if pv_null {
                target.blob_edit(tl, l_total + v_total, &[]);
            } else {
                let saved = target.delta;
                target.delta = 0;
                merge_patch(target, tv, patch, p_value)?;
                target.delta += saved;
            }
        } else if !pv_null {
            let label_bytes = &patch[p_label..p_value];
            if patch[p_value] & 0x0f != Kind::Object as u8 {
                let mut ins: Vec<u8> =
                    Vec::with_capacity(label_bytes.len() + npv + szpv);
                ins.extend_from_slice(label_bytes);
                ins.extend_from_slice(&patch[p_value..p_value + npv + szpv]);
                target.blob_edit(t_end, 0, &ins);
            } else {
                // Append the label and an empty-object placeholder, then
                // merge the patch value into the placeholder.
                let mut ins = label_bytes.to_vec();
                ins.push(Kind::Object as u8);
                target.blob_edit(t_end, 0, &ins);
                let saved = target.delta;
                target.delta = 0;
                merge_patch(target, t_end + label_bytes.len(), patch, p_value)?;
                target.delta += saved;
            }
        }
    }
    if target.delta != 0 {
        target.after_edit_size_adjust(i_target);
    }
    Ok(())
}

/// Cross-kind label equality: both labels rendered to canonical text.
fn labels_render_equal(a: &[u8], ia: usize, b: &[u8], ib: usize) -> bool {
    let mut s1 = JsonText::new();
    render::render_element(a, ia, &mut s1);
    let mut s2 = JsonText::new();
    render::render_element(b, ib, &mut s2);
    s1.as_str() == s2.as_str()
}
