use poise::serenity_prelude as serenity;

/// Resolve a member's effective guild permissions from their roles.
///
/// The guild owner implicitly holds every permission.
pub async fn resolve_user_permissions(
    http: &serenity::Http,
    guild_id: serenity::GuildId,
    user_id: serenity::UserId,
) -> anyhow::Result<serenity::Permissions> {
    let guild = guild_id.to_partial_guild(http).await?;
    if guild.owner_id == user_id {
        return Ok(serenity::Permissions::all());
    }

    let member = guild_id.member(http, user_id).await?;
    let roles = guild_id.roles(http).await?;

    let mut resolved = serenity::Permissions::empty();
    let everyone_role_id = serenity::RoleId::new(guild_id.get());

    for role in roles.values() {
        if role.id == everyone_role_id || member.roles.contains(&role.id) {
            resolved |= role.permissions;
        }
    }

    Ok(resolved)
}

/// Whether a permission set counts as a chat administrator.
pub fn is_admin_permissions(perms: serenity::Permissions) -> bool {
    perms.contains(serenity::Permissions::ADMINISTRATOR)
        || perms.contains(serenity::Permissions::MANAGE_GUILD)
}

/// Whether the user is a chat administrator (owner, `ADMINISTRATOR` or `MANAGE_GUILD`).
pub async fn is_chat_admin(
    http: &serenity::Http,
    guild_id: serenity::GuildId,
    user_id: serenity::UserId,
) -> anyhow::Result<bool> {
    let perms = resolve_user_permissions(http, guild_id, user_id).await?;
    Ok(is_admin_permissions(perms))
}

#[cfg(test)]
mod tests {
    use poise::serenity_prelude as serenity;

    use super::is_admin_permissions;

    #[test]
    fn admin_permissions_are_recognized() {
        assert!(is_admin_permissions(serenity::Permissions::ADMINISTRATOR));
        assert!(is_admin_permissions(
            serenity::Permissions::MANAGE_GUILD | serenity::Permissions::SEND_MESSAGES
        ));
        assert!(!is_admin_permissions(
            serenity::Permissions::MANAGE_MESSAGES | serenity::Permissions::MODERATE_MEMBERS
        ));
        assert!(!is_admin_permissions(serenity::Permissions::empty()));
    }
}
