//! The relation-named surface generated by `equal_nest!`

mod common;

use equal_nest::equal_nest;
use pretty_assertions::assert_eq;

use common::{Person, count_rows, names, person, setup};

equal_nest!(Person, friend);

#[tokio::test]
async fn test_friend_scenario() {
    let (db, mut manager) = setup().await;
    let john = person(&mut manager, "john");
    let jean = person(&mut manager, "jean");
    let phil = person(&mut manager, "phil");

    manager.add_friend(john, jean).unwrap();
    assert!(manager.has_friend(jean, john).await.unwrap());
    assert_eq!(manager.count_friends(john).await.unwrap(), 1);

    manager.set_friends(john, [jean, phil]).await.unwrap();
    manager.save(john).await.unwrap();

    assert_eq!(count_rows(&db, "person").await, 3);
    assert_eq!(manager.count_friends(john).await.unwrap(), 2);
    assert!(manager.has_friend(phil, john).await.unwrap());

    let friends = manager.get_friends(john).await.unwrap();
    assert_eq!(names(&manager, &friends), vec!["jean", "phil"]);
}

#[tokio::test]
async fn test_bulk_friends() {
    let (db, mut manager) = setup().await;
    let john = person(&mut manager, "john");
    let others: Vec<_> = ["jean", "phil", "henri"]
        .into_iter()
        .map(|name| person(&mut manager, name))
        .collect();

    manager.add_friends(john, &others).unwrap();
    manager.save(john).await.unwrap();

    manager.remove_friends(john, Some(&others[..1])).await.unwrap();
    manager.remove_friend(john, others[1]).unwrap();
    assert_eq!(manager.count_friends(john).await.unwrap(), 1);

    manager.remove_friends(john, None).await.unwrap();
    manager.save(john).await.unwrap();
    assert_eq!(count_rows(&db, "friend").await, 0);
}

#[tokio::test]
async fn test_friend_queries() {
    let (_db, mut manager) = setup().await;
    let jean = person(&mut manager, "jean");
    let phil = person(&mut manager, "phil");

    manager.add_friend(jean, phil).unwrap();
    assert_eq!(
        manager
            .query()
            .count_friends_of(manager.entity(phil).unwrap())
            .await
            .unwrap(),
        0
    );

    manager.save(jean).await.unwrap();
    let query = manager.query();
    let phil_entity = manager.entity(phil).unwrap();
    assert_eq!(query.count_friends_of(phil_entity).await.unwrap(), 1);

    let found = query.find_friends_of(phil_entity).await.unwrap();
    assert_eq!(found.len(), 1);
    assert_eq!(found[0].name, "jean");
}
