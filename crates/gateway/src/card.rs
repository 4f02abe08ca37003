//! Discovery document built from the `[agent]` config section.

use agentmesh_config::AppConfig;
use agentmesh_core::card::{
    AgentCapabilities, AgentCard, AgentInterface, AgentProvider, AgentSkill, PROTOCOL_VERSION,
};

pub fn agent_card(config: &AppConfig) -> AgentCard {
    let identity = &config.agent;
    let url = match &identity.public_url {
        Some(base) => format!("{}{}", base.trim_end_matches('/'), config.gateway.rpc_path),
        None => config.gateway.rpc_path.clone(),
    };

    AgentCard {
        protocol_version: PROTOCOL_VERSION.into(),
        name: identity.name.clone(),
        description: identity.description.clone(),
        version: identity.version.clone(),
        supported_interfaces: vec![AgentInterface::json_rpc(url)],
        provider: AgentProvider {
            organization: identity.organization.clone(),
            url: identity.organization_url.clone(),
        },
        skills: identity
            .skills
            .iter()
            .map(|s| AgentSkill {
                id: s.id.clone(),
                name: s.name.clone(),
                description: s.description.clone(),
                tags: s.tags.clone(),
                input_modes: vec!["text/plain".into()],
                output_modes: vec!["text/plain".into()],
                examples: s.examples.clone(),
            })
            .collect(),
        capabilities: AgentCapabilities {
            streaming: false,
            push_notifications: false,
            state_transition_history: true,
        },
    }
}
