//! Equipment: drop tables, inventory paging and equip/unequip.
//!
//! An item always lives in exactly one place: `inventory` or `equipped[slot]`.
use chrono::{DateTime, Utc};
use rand::seq::SliceRandom;
use rand::Rng;
use uuid::Uuid;

use crate::economy::{EconomyError, Item, ItemSlot, StatBonus, UserRecord};

pub const INVENTORY_PAGE_SIZE: usize = 8;

#[derive(Debug, Clone, Copy)]
enum Stat {
    Attack(i64),
    Defense(i64),
    Hp(i64),
    Speed(i64),
    Luck(i64),
    CritRate(i64),
    Evasion(i64),
}

/// A template stat either scales with the drop's level multiplier or stays fixed.
#[derive(Debug, Clone, Copy)]
enum Bonus {
    Scaled(Stat),
    Flat(Stat),
}

struct Template {
    name: &'static str,
    bonuses: &'static [Bonus],
}

use Bonus::{Flat, Scaled as S};
use Stat::*;

const WEAPONS: &[Template] = &[
    Template { name: "Iron Sword", bonuses: &[S(Attack(5))] },
    Template { name: "Steel Blade", bonuses: &[S(Attack(7))] },
    Template { name: "Flaming Blade", bonuses: &[S(Attack(10)), Flat(CritRate(2))] },
    Template { name: "Shadow Dagger", bonuses: &[S(Attack(6)), Flat(Speed(3))] },
    Template { name: "War Hammer", bonuses: &[S(Attack(12)), Flat(Defense(2))] },
];

const ARMORS: &[Template] = &[
    Template { name: "Leather Armor", bonuses: &[S(Defense(6))] },
    Template { name: "Chainmail", bonuses: &[S(Defense(8))] },
    Template { name: "Obsidian Plate", bonuses: &[S(Defense(15)), Flat(Hp(20))] },
    Template { name: "Dragon Scale", bonuses: &[S(Defense(12)), Flat(Attack(3))] },
    Template { name: "Mage Robe", bonuses: &[S(Defense(5)), Flat(Luck(4))] },
];

const SHOES: &[Template] = &[
    Template { name: "Leather Boots", bonuses: &[S(Speed(3))] },
    Template { name: "Swift Boots", bonuses: &[S(Speed(5))] },
    Template { name: "Windwalkers", bonuses: &[S(Speed(7)), Flat(Evasion(3))] },
    Template { name: "Iron Boots", bonuses: &[S(Speed(2)), Flat(Defense(4))] },
    Template { name: "Shadow Steps", bonuses: &[S(Speed(6)), Flat(Luck(2))] },
];

const ACCESSORIES: &[Template] = &[
    Template { name: "Lucky Charm", bonuses: &[S(Luck(4))] },
    Template { name: "Ring of Power", bonuses: &[S(Attack(4)), S(Defense(4))] },
    Template { name: "Health Amulet", bonuses: &[Flat(Hp(25)), S(Defense(3))] },
    Template { name: "Speed Ring", bonuses: &[S(Speed(5)), Flat(Evasion(2))] },
    Template { name: "Warrior's Badge", bonuses: &[S(Attack(6)), Flat(Hp(15))] },
];

fn pool(slot: ItemSlot) -> &'static [Template] {
    match slot {
        ItemSlot::Weapon => WEAPONS,
        ItemSlot::Armor => ARMORS,
        ItemSlot::Shoe => SHOES,
        ItemSlot::Accessory => ACCESSORIES,
    }
}

fn apply(bonus: &mut StatBonus, stat: Stat, factor: i64) {
    match stat {
        Attack(v) => bonus.attack += v * factor,
        Defense(v) => bonus.defense += v * factor,
        Hp(v) => bonus.hp += v * factor,
        Speed(v) => bonus.speed += v * factor,
        Luck(v) => bonus.luck += v * factor,
        CritRate(v) => bonus.crit_rate += v * factor,
        Evasion(v) => bonus.evasion += v * factor,
    }
}

/// Drop scaling for an enemy level: `max(1, level / 3)`.
pub fn level_multiplier(enemy_level: u32) -> i64 {
    i64::from((enemy_level / 3).max(1))
}

/// Build a random item for `slot`, scaled by `multiplier`.
pub fn generate_item<R: Rng + ?Sized>(
    slot: ItemSlot,
    multiplier: i64,
    now: DateTime<Utc>,
    rng: &mut R,
) -> Item {
    let templates = pool(slot);
    let template = templates
        .choose(rng)
        .unwrap_or(&templates[0]);
    let mut bonus = StatBonus::default();
    for b in template.bonuses {
        match *b {
            Bonus::Scaled(stat) => apply(&mut bonus, stat, multiplier),
            Bonus::Flat(stat) => apply(&mut bonus, stat, 1),
        }
    }
    Item {
        id: Uuid::new_v4().simple().to_string(),
        name: template.name.to_string(),
        slot,
        bonus,
        obtained_at: now,
    }
}

/// Roll for a drop after a fight. Returns the item already placed in the inventory.
pub fn roll_drop<R: Rng + ?Sized>(
    user: &mut UserRecord,
    chance: f64,
    enemy_level: u32,
    now: DateTime<Utc>,
    rng: &mut R,
) -> Option<Item> {
    if rng.gen::<f64>() >= chance {
        return None;
    }
    let slot = *ItemSlot::ALL.choose(rng)?;
    let item = generate_item(slot, level_multiplier(enemy_level), now, rng);
    user.inventory.push(item.clone());
    Some(item)
}

/// Equip an inventory item by id. A prefix works when it names exactly one item. Any item
/// already in that slot goes back to the inventory. Returns (equipped, replaced).
pub fn equip(user: &mut UserRecord, id: &str) -> Result<(Item, Option<Item>), EconomyError> {
    let needle = id.trim();
    if needle.is_empty() {
        return Err(EconomyError::InvalidArgument("give an item id to equip".into()));
    }
    let pos = match user.inventory.iter().position(|i| i.id == needle) {
        Some(pos) => pos,
        None => {
            let mut hits = user
                .inventory
                .iter()
                .enumerate()
                .filter(|(_, i)| i.id.starts_with(needle))
                .map(|(pos, _)| pos);
            match (hits.next(), hits.next()) {
                (Some(pos), None) => pos,
                (Some(_), Some(_)) => {
                    return Err(EconomyError::InvalidArgument(format!(
                        "'{}' matches more than one item, type more of the id",
                        needle
                    )))
                }
                (None, _) => {
                    return Err(EconomyError::NotFound(format!(
                        "no item with id '{}' in your inventory",
                        needle
                    )))
                }
            }
        }
    };
    let item = user.inventory.remove(pos);
    let replaced = user.equipped.insert(item.slot, item.clone());
    if let Some(old) = &replaced {
        user.inventory.push(old.clone());
    }
    Ok((item, replaced))
}

pub fn unequip(user: &mut UserRecord, slot_name: &str) -> Result<Item, EconomyError> {
    let slot = ItemSlot::parse(slot_name).ok_or_else(|| {
        EconomyError::InvalidArgument("slot must be one of weapon, armor, shoe, accessory".into())
    })?;
    let item = user
        .equipped
        .remove(&slot)
        .ok_or_else(|| EconomyError::NotFound(format!("nothing equipped in {}", slot)))?;
    user.inventory.push(item.clone());
    Ok(item)
}

/// One page of the inventory (1-based). Returns the items plus the page count.
pub fn inventory_page(user: &UserRecord, page: usize) -> (&[Item], usize) {
    let pages = user.inventory.len().div_ceil(INVENTORY_PAGE_SIZE).max(1);
    let page = page.clamp(1, pages);
    let start = (page - 1) * INVENTORY_PAGE_SIZE;
    let end = (start + INVENTORY_PAGE_SIZE).min(user.inventory.len());
    (&user.inventory[start.min(end)..end], pages)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn item(id: &str, slot: ItemSlot, attack: i64) -> Item {
        Item {
            id: id.to_string(),
            name: format!("item {}", id),
            slot,
            bonus: StatBonus {
                attack,
                ..StatBonus::default()
            },
            obtained_at: Utc::now(),
        }
    }

    #[test]
    fn generated_items_scale_only_scaled_stats() {
        let mut rng = StdRng::seed_from_u64(1);
        for _ in 0..50 {
            let it = generate_item(ItemSlot::Weapon, 3, Utc::now(), &mut rng);
            assert_eq!(it.slot, ItemSlot::Weapon);
            assert_eq!(it.bonus.attack % 3, 0, "{} attack should be scaled", it.name);
            assert_eq!(it.id.len(), 32);
        }
    }

    #[test]
    fn item_ids_stay_unique_across_many_drops() {
        let mut rng = StdRng::seed_from_u64(3);
        let ids: std::collections::HashSet<String> = (0..2000)
            .map(|_| generate_item(ItemSlot::Armor, 1, Utc::now(), &mut rng).id)
            .collect();
        assert_eq!(ids.len(), 2000);
    }

    #[test]
    fn equip_by_prefix_needs_a_unique_match() {
        let mut u = UserRecord::new("i", Utc::now());
        u.inventory.push(item("abc123", ItemSlot::Weapon, 5));
        u.inventory.push(item("abd456", ItemSlot::Armor, 2));
        assert!(matches!(equip(&mut u, "ab"), Err(EconomyError::InvalidArgument(_))));
        assert!(matches!(equip(&mut u, "zz"), Err(EconomyError::NotFound(_))));
        assert_eq!(u.inventory.len(), 2);

        let (eq, _) = equip(&mut u, "abd").unwrap();
        assert_eq!(eq.id, "abd456");
        assert_eq!(eq.short_id(), "abd456");
    }

    #[test]
    fn level_multiplier_floor_is_one() {
        assert_eq!(level_multiplier(1), 1);
        assert_eq!(level_multiplier(5), 1);
        assert_eq!(level_multiplier(6), 2);
        assert_eq!(level_multiplier(10), 3);
    }

    #[test]
    fn equip_swaps_and_keeps_single_location() {
        let mut u = UserRecord::new("i", Utc::now());
        u.inventory.push(item("aaa", ItemSlot::Weapon, 5));
        u.inventory.push(item("bbb", ItemSlot::Weapon, 9));

        let (eq, replaced) = equip(&mut u, "aaa").unwrap();
        assert_eq!(eq.id, "aaa");
        assert!(replaced.is_none());
        assert_eq!(u.inventory.len(), 1);

        let (_, replaced) = equip(&mut u, "bb").unwrap();
        assert_eq!(replaced.unwrap().id, "aaa");
        assert_eq!(u.equipped[&ItemSlot::Weapon].id, "bbb");
        assert_eq!(u.inventory.len(), 1);
        assert_eq!(u.inventory[0].id, "aaa");
        assert_eq!(u.equipment_bonus().attack, 9);
    }

    #[test]
    fn unequip_validates_slot() {
        let mut u = UserRecord::new("i", Utc::now());
        assert!(matches!(unequip(&mut u, "hat"), Err(EconomyError::InvalidArgument(_))));
        assert!(matches!(unequip(&mut u, "armor"), Err(EconomyError::NotFound(_))));
        u.inventory.push(item("ccc", ItemSlot::Armor, 0));
        equip(&mut u, "ccc").unwrap();
        let back = unequip(&mut u, "ARMOR").unwrap();
        assert_eq!(back.id, "ccc");
        assert!(u.equipped.is_empty());
        assert_eq!(u.inventory.len(), 1);
    }

    #[test]
    fn inventory_pages_of_eight() {
        let mut u = UserRecord::new("i", Utc::now());
        for n in 0..19 {
            u.inventory.push(item(&format!("{:03}", n), ItemSlot::Shoe, 0));
        }
        let (first, pages) = inventory_page(&u, 1);
        assert_eq!(pages, 3);
        assert_eq!(first.len(), 8);
        let (last, _) = inventory_page(&u, 9);
        assert_eq!(last.len(), 3);
        let empty = UserRecord::new("e", Utc::now());
        let (none, pages) = inventory_page(&empty, 1);
        assert!(none.is_empty());
        assert_eq!(pages, 1);
    }

    #[test]
    fn drop_chance_zero_never_drops() {
        let mut u = UserRecord::new("i", Utc::now());
        let mut rng = StdRng::seed_from_u64(2);
        assert!(roll_drop(&mut u, 0.0, 10, Utc::now(), &mut rng).is_none());
        let dropped = roll_drop(&mut u, 1.0, 10, Utc::now(), &mut rng).unwrap();
        assert_eq!(u.inventory[0], dropped);
    }
}
