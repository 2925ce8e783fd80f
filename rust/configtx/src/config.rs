use configtx_tree::{Config, ConfigUpdate};
use tracing::debug;

use crate::{
    APPLICATION_GROUP_KEY, ApplicationGroup, CONSORTIUMS_GROUP_KEY, ChannelGroup, ConfigTxError,
    ConsortiumsGroup, ORDERER_GROUP_KEY, OrdererGroup, payload::CodecError,
};

/// A pending change to a channel configuration.
///
/// The configuration handed to [`ConfigTx::new`] is kept as the original and
/// never modified. Every mutation goes to a separate working copy, and
/// [`ConfigTx::compute_update`] compares the two on demand.
#[derive(Clone, Debug)]
pub struct ConfigTx {
    original: Config,
    updated: Config,
}

impl ConfigTx {
    /// Open a configuration for modification.
    pub fn new(config: Config) -> Self {
        Self {
            updated: config.clone(),
            original: config,
        }
    }

    /// The configuration as it was opened.
    pub fn original(&self) -> &Config {
        &self.original
    }

    /// The working copy, with every mutation applied so far.
    pub fn updated(&self) -> &Config {
        &self.updated
    }

    /// The channel (root) group of the working copy.
    pub fn channel(&mut self) -> ChannelGroup<'_> {
        ChannelGroup::new(&mut self.updated.channel_group)
    }

    /// The application group of the working copy.
    pub fn application(&mut self) -> Result<ApplicationGroup<'_>, ConfigTxError> {
        self.updated
            .channel_group
            .group_mut(APPLICATION_GROUP_KEY)
            .map(ApplicationGroup::new)
            .ok_or_else(|| ConfigTxError::NotFound("application group does not exist".into()))
    }

    /// The orderer group of the working copy.
    pub fn orderer(&mut self) -> Result<OrdererGroup<'_>, ConfigTxError> {
        self.updated
            .channel_group
            .group_mut(ORDERER_GROUP_KEY)
            .map(OrdererGroup::new)
            .ok_or_else(|| ConfigTxError::NotFound("orderer group does not exist".into()))
    }

    /// The consortiums group of the working copy.
    pub fn consortiums(&mut self) -> Result<ConsortiumsGroup<'_>, ConfigTxError> {
        self.updated
            .channel_group
            .group_mut(CONSORTIUMS_GROUP_KEY)
            .map(ConsortiumsGroup::new)
            .ok_or_else(|| ConfigTxError::NotFound("consortiums group does not exist".into()))
    }

    /// The update that turns the original into the working copy.
    ///
    /// The update is empty when nothing changed.
    pub fn compute_update(&self, channel_id: &str) -> ConfigUpdate {
        ConfigUpdate::compute(
            channel_id,
            &self.original.channel_group,
            &self.updated.channel_group,
        )
    }

    /// The canonical encoding of [`ConfigTx::compute_update`].
    ///
    /// Fails when there is nothing to propose.
    pub fn compute_marshaled_update(&self, channel_id: &str) -> Result<Vec<u8>, ConfigTxError> {
        let update = self.compute_update(channel_id);
        if update.is_empty() {
            return Err(ConfigTxError::InvalidArgument(
                "no differences detected between original and updated config".into(),
            ));
        }

        let bytes = update.to_canonical_bytes().map_err(|error| {
            ConfigTxError::malformed(
                "marshaling config update",
                CodecError::Encode {
                    name: "config update",
                    message: error.to_string(),
                },
            )
        })?;
        debug!(channel = channel_id, bytes = bytes.len(), "Marshaled config update");
        Ok(bytes)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{CapabilityScope, Policy, PolicyScope};
    use configtx_tree::ConfigGroup;
    use testresult::TestResult;

    #[test]
    fn it_leaves_the_original_untouched() -> TestResult {
        let mut tx = ConfigTx::new(Config::new(ConfigGroup::new("Admins")));

        tx.channel()
            .set_policy("Readers", Policy::implicit_meta("ANY Readers"))?;
        tx.channel().add_capability("V2_0")?;

        assert!(tx.original().channel_group.policies.is_empty());
        assert!(tx.original().channel_group.values.is_empty());
        assert_eq!(tx.updated().channel_group.policies.len(), 1);
        Ok(())
    }

    #[test]
    fn it_refuses_to_marshal_an_empty_update() {
        let tx = ConfigTx::new(Config::default());

        assert!(tx.compute_update("mychannel").is_empty());
        assert_eq!(
            tx.compute_marshaled_update("mychannel")
                .unwrap_err()
                .to_string(),
            "no differences detected between original and updated config"
        );
    }

    #[test]
    fn it_marshals_a_non_empty_update() -> TestResult {
        let mut tx = ConfigTx::new(Config::default());
        tx.channel().set_mod_policy("Admins")?;

        let bytes = tx.compute_marshaled_update("mychannel")?;
        let update = ConfigUpdate::from_bytes(&bytes)?;

        assert_eq!(update.channel_id, "mychannel");
        assert_eq!(update.write_set.mod_policy, "Admins");
        assert_eq!(update.write_set.version, 1);
        Ok(())
    }

    #[test]
    fn it_reports_missing_sub_groups() {
        let mut tx = ConfigTx::new(Config::default());

        assert!(matches!(
            tx.application(),
            Err(ConfigTxError::NotFound(message)) if message == "application group does not exist"
        ));
        assert!(tx.orderer().is_err());
        assert!(tx.consortiums().is_err());
    }
}
