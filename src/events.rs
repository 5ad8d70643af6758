//! Routines driven by external schedulers.
//!
//! A periodic "mood lighting" driver repeatedly calls
//! [`randomize_group_lights`] on a timer; the timer itself (and its
//! cancellation) is the driver's responsibility, not ours.

use crate::client::HueClient;
use crate::error::HueError;
use crate::models::hue::GroupId;
use crate::transport::HubTransport;
use serde_json::Map;

/// One randomizer tick: make sure every light in the group is on, then push
/// a fresh random value for each requested attribute.
pub fn randomize_group_lights<T: HubTransport>(
    client: &mut HueClient<T>,
    group_id: &GroupId,
    attrs: &[&str],
) -> Result<(), HueError> {
    let light_ids = client
        .group(group_id)
        .ok_or_else(|| HueError::GroupNotFound(group_id.clone()))?
        .lights
        .clone();

    for id in light_ids {
        if !client.light(id).map(|light| light.is_on()).unwrap_or(false) {
            client.turn_on(id)?;
        }
        let mut data = Map::new();
        for attr in attrs {
            data.insert((*attr).to_string(), client.random_attribute(attr)?);
        }
        client.set_light_attribute(id, &data)?;
    }
    Ok(())
}
