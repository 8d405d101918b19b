//! Time-axis gap filling.

use indexmap::IndexMap;

use crate::tidy::TidyTable;

/// Fill gaps in every metric column, one entity at a time.
///
/// Values are placed on the year time axis (days since the common era), so
/// gaps are weighted by elapsed time rather than row distance. Interior gaps
/// are filled linearly; leading and trailing gaps take the nearest known value.
/// An entity with no values in a column keeps nulls there.
pub fn interpolate_by_entity(table: &mut TidyTable) {
    let mut groups: IndexMap<&str, Vec<usize>> = IndexMap::new();
    for (idx, key) in table.keys().iter().enumerate() {
        groups.entry(key.entity.as_str()).or_default().push(idx);
    }

    let groups: Vec<(Vec<usize>, Vec<i64>)> = groups
        .into_values()
        .map(|mut rows| {
            rows.sort_by_key(|&r| table.keys()[r].year);
            let axis = rows.iter().map(|&r| table.keys()[r].year.axis()).collect();
            (rows, axis)
        })
        .collect();

    for values in table.columns_mut() {
        for (rows, axis) in &groups {
            let mut series: Vec<Option<f64>> = rows.iter().map(|&r| values[r]).collect();
            fill_series(axis, &mut series);
            for (&r, filled) in rows.iter().zip(series) {
                values[r] = filled;
            }
        }
    }
}

/// Fill the gaps of one series in place. `axis` must be strictly increasing.
pub fn fill_series(axis: &[i64], values: &mut [Option<f64>]) {
    debug_assert_eq!(axis.len(), values.len());

    let known: Vec<usize> = values
        .iter()
        .enumerate()
        .filter_map(|(i, v)| v.map(|_| i))
        .collect();
    let (Some(&first), Some(&last)) = (known.first(), known.last()) else {
        return;
    };

    let mut next = 0;
    for i in 0..values.len() {
        if values[i].is_some() {
            continue;
        }
        if i < first {
            values[i] = values[first];
            continue;
        }
        if i > last {
            values[i] = values[last];
            continue;
        }

        while known[next + 1] < i {
            next += 1;
        }
        let (lo, hi) = (known[next], known[next + 1]);
        let (Some(v0), Some(v1)) = (values[lo], values[hi]) else {
            continue;
        };
        let span = (axis[hi] - axis[lo]) as f64;
        let offset = (axis[i] - axis[lo]) as f64;
        values[i] = Some(v0 + (v1 - v0) * offset / span);
    }
}
