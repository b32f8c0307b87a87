//! The `auth0_trigger_binding` resource.
//!
//! Binds an ordered list of deployed actions to a trigger. The bindings of a
//! trigger are replaced as a whole on every write, and the order of the list
//! is the order in which Auth0 executes the actions.

use crate::lock_table::LockTable;
use crate::management::{ActionBinding, BindingUpdate, ManagementApi};
use crate::resources::schema::{AttributeSchema, ResourceSchema};
use crate::resources::{ResourceError, ResourceState};
use log::{debug, info};
use serde_json::{Value, json};
use std::sync::Arc;

pub const TYPE_NAME: &str = "auth0_trigger_binding";

/// Triggers that accept action bindings.
pub const SUPPORTED_TRIGGERS: &[&str] = &[
    "post-login",
    "credentials-exchange",
    "pre-user-registration",
    "post-user-registration",
    "post-change-password",
    "send-phone-message",
    "iga-approval",
    "iga-certification",
    "iga-fulfillment-assignment",
    "iga-fulfillment-execution",
];

/// Schema of `auth0_trigger_binding`.
pub fn schema() -> ResourceSchema {
    ResourceSchema::new(
        TYPE_NAME,
        "With this resource, you can bind an action to a trigger. Once an action is created \
         and deployed, it can be attached (i.e. bound) to a trigger so that it will be executed as \
         part of a flow. The list of actions reflects the order in which they will be executed during \
         the appropriate flow.",
    )
    .attribute(
        AttributeSchema::string("trigger")
            .required()
            .force_new()
            .one_of(SUPPORTED_TRIGGERS)
            .description("The ID of the trigger to bind with."),
    )
    .attribute(
        AttributeSchema::object_list(
            "actions",
            vec![
                AttributeSchema::string("id").required().description("Action ID."),
                AttributeSchema::string("display_name")
                    .required()
                    .description("The name of an action."),
            ],
        )
        .required()
        .description("The actions bound to this trigger"),
    )
}

/// Lifecycle handlers for `auth0_trigger_binding`.
pub struct TriggerBindingResource<M> {
    api: Arc<M>,
    locks: LockTable,
    schema: ResourceSchema,
}

impl<M: ManagementApi> TriggerBindingResource<M> {
    pub fn new(api: Arc<M>, locks: LockTable) -> Self {
        Self {
            api,
            locks,
            schema: schema(),
        }
    }

    pub fn schema(&self) -> &ResourceSchema {
        &self.schema
    }

    /// Bind the configured actions to the trigger.
    pub async fn create(&self, config: &Value) -> Result<ResourceState, ResourceError> {
        self.schema.validate(config)?;
        let mut state = ResourceState::from_config(config);
        let trigger = state.get_str("trigger").unwrap_or_default().to_string();

        self.replace_bindings(&trigger, expand_bindings(config)).await?;
        state.set_id(trigger.as_str());
        info!("Created {} for trigger '{}'", TYPE_NAME, trigger);

        self.read(&mut state).await?;
        Ok(state)
    }

    /// Refresh the bound actions, clearing the ID if the trigger is gone.
    pub async fn read(&self, state: &mut ResourceState) -> Result<(), ResourceError> {
        let trigger = Self::trigger_id(state)?;
        match self.api.trigger_bindings(&trigger).await {
            Ok(list) => {
                state.set("trigger", trigger.as_str());
                state.set("actions", flatten_bindings(&list.bindings));
                Ok(())
            }
            Err(err) if err.is_not_found() => {
                debug!("Trigger '{}' not found, dropping binding from state", trigger);
                state.clear_id();
                Ok(())
            }
            Err(err) => Err(err.into()),
        }
    }

    /// Replace the bound actions with the configured list.
    pub async fn update(&self, state: &mut ResourceState, config: &Value) -> Result<(), ResourceError> {
        self.schema.validate(config)?;
        let replaced = self.schema.replacement_attributes(state.attributes(), config);
        if !replaced.is_empty() {
            return Err(ResourceError::RequiresReplacement {
                attributes: replaced,
            });
        }

        let trigger = Self::trigger_id(state)?;
        self.replace_bindings(&trigger, expand_bindings(config)).await?;
        info!("Updated {} for trigger '{}'", TYPE_NAME, trigger);
        self.read(state).await
    }

    /// Unbind every action from the trigger.
    pub async fn delete(&self, state: &mut ResourceState) -> Result<(), ResourceError> {
        let trigger = Self::trigger_id(state)?;
        match self.replace_bindings(&trigger, Vec::new()).await {
            Ok(()) => {}
            Err(ResourceError::Management(err)) if err.is_not_found() => {
                debug!("Trigger '{}' already gone", trigger);
            }
            Err(err) => return Err(err),
        }
        state.clear_id();
        Ok(())
    }

    /// Start state for an existing trigger; the import ID is the trigger ID.
    pub fn import(&self, id: &str) -> Result<ResourceState, ResourceError> {
        if id.is_empty() {
            return Err(ResourceError::EmptyImportId);
        }
        let mut state = ResourceState::new();
        state.set_id(id);
        Ok(state)
    }

    async fn replace_bindings(
        &self,
        trigger: &str,
        bindings: Vec<BindingUpdate>,
    ) -> Result<(), ResourceError> {
        let _guard = self.locks.lock(&format!("trigger:{}", trigger)).await;
        self.api.update_trigger_bindings(trigger, bindings).await?;
        Ok(())
    }

    fn trigger_id(state: &ResourceState) -> Result<String, ResourceError> {
        state
            .id()
            .map(str::to_string)
            .ok_or_else(|| ResourceError::MissingId {
                resource: TYPE_NAME.to_string(),
            })
    }
}

/// Turn the configured `actions` list into binding update bodies, keeping order.
pub fn expand_bindings(config: &Value) -> Vec<BindingUpdate> {
    config
        .get("actions")
        .and_then(Value::as_array)
        .map(|actions| {
            actions
                .iter()
                .map(|action| {
                    BindingUpdate::action_id(
                        action.get("id").and_then(Value::as_str).unwrap_or_default(),
                        action
                            .get("display_name")
                            .and_then(Value::as_str)
                            .unwrap_or_default(),
                    )
                })
                .collect()
        })
        .unwrap_or_default()
}

/// Turn remote bindings into the `actions` state list.
pub fn flatten_bindings(bindings: &[ActionBinding]) -> Value {
    Value::Array(
        bindings
            .iter()
            .map(|binding| {
                json!({
                    "id": binding.action.id,
                    "display_name": binding.display_name,
                })
            })
            .collect(),
    )
}
